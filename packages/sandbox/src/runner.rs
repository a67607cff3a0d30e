// ABOUTME: Container runner trait and the bollard-backed Docker implementation
// ABOUTME: One disposable container per request with enforced resource ceilings

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::models::{HostConfig, RestartPolicy, RestartPolicyNameEnum};
use bollard::Docker;
use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SandboxError};
use crate::types::{ExecOutput, ResourceLimits};

/// Cap on captured output per stream; anything beyond is dropped
pub const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// Labels applied to every Corral container for tracking
const CORRAL_LABEL: &str = "corral.managed";
const CORRAL_REQUEST_LABEL: &str = "corral.request_id";

/// Everything the runner needs to execute one request
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub request_id: String,
    pub image: String,
    /// Executed as `/bin/sh -c <command>` inside the container
    pub command: String,
    /// Host directory bind-mounted at /workspace as the working directory
    pub scratch_dir: PathBuf,
    pub limits: ResourceLimits,
}

/// Executes one command in a freshly created, disposable container
///
/// Implementations own the wall-clock budget: on expiry they must tear the
/// container down and return [`SandboxError::Timeout`]. No container state
/// may persist across calls.
#[async_trait]
pub trait ContainerRunner: Send + Sync {
    async fn run(&self, spec: &ContainerSpec) -> Result<ExecOutput>;

    /// Remove leftover containers older than `max_age_hours`; returns their ids
    async fn sweep_stale(&self, _max_age_hours: u64) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Docker-backed runner
pub struct DockerRunner {
    docker: Docker,
}

impl DockerRunner {
    /// Connect to the Docker daemon and verify it answers
    ///
    /// Unix: /var/run/docker.sock; Windows: npipe:////./pipe/docker_engine
    pub async fn connect() -> Result<Self> {
        #[cfg(unix)]
        let docker = Docker::connect_with_socket_defaults()?;

        #[cfg(windows)]
        let docker = Docker::connect_with_named_pipe_defaults()?;

        docker.ping().await.map_err(|e| {
            error!("Failed to connect to Docker daemon: {}", e);
            SandboxError::Docker(e)
        })?;

        info!("Connected to Docker daemon");
        Ok(Self { docker })
    }

    /// Docker images must be pre-pulled; the service never pulls on demand
    async fn ensure_image(&self, image: &str) -> Result<()> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(()),
            Err(_) => Err(SandboxError::ImageError(format!(
                "image {} not found locally; pull it first with: docker pull {}",
                image, image
            ))),
        }
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let host_config = HostConfig {
            memory: Some((spec.limits.memory_mb * 1024 * 1024) as i64),
            // CPU quota (100000 = 1 core)
            cpu_quota: Some((spec.limits.cpu_cores * 100_000.0) as i64),
            cpu_period: Some(100_000),
            network_mode: Some("none".to_string()),
            restart_policy: Some(RestartPolicy {
                name: Some(RestartPolicyNameEnum::NO),
                maximum_retry_count: Some(0),
            }),
            cap_drop: Some(vec!["ALL".to_string()]),
            privileged: Some(false),
            binds: Some(vec![format!(
                "{}:/workspace",
                spec.scratch_dir.display()
            )]),
            ..Default::default()
        };

        let mut labels = HashMap::new();
        labels.insert(CORRAL_LABEL.to_string(), "true".to_string());
        labels.insert(CORRAL_REQUEST_LABEL.to_string(), spec.request_id.clone());

        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                spec.command.clone(),
            ]),
            working_dir: Some("/workspace".to_string()),
            host_config: Some(host_config),
            labels: Some(labels),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: format!("corral-{}", spec.request_id),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| {
                error!("Failed to create container: {}", e);
                SandboxError::ContainerStartFailed(e.to_string())
            })?;

        debug!(
            "Created container {} for request {}",
            response.id, spec.request_id
        );
        Ok(response.id)
    }

    /// Block until the container exits, yielding its exit code
    async fn wait_for_exit(&self, container_id: &str) -> Result<i64> {
        let mut wait_stream = self
            .docker
            .wait_container(container_id, None::<WaitContainerOptions<String>>);

        match wait_stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard surfaces non-zero exits as a wait error carrying the code
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(SandboxError::Docker(e)),
            None => Err(SandboxError::ContainerStartFailed(
                "wait stream ended without a status".to_string(),
            )),
        }
    }

    /// Capture stdout/stderr verbatim, capped at [`MAX_CAPTURE_BYTES`] each
    async fn collect_output(&self, container_id: &str) -> Result<(String, String)> {
        let options = LogsOptions::<String> {
            follow: false,
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        let mut log_stream = self.docker.logs(container_id, Some(options));
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        while let Some(chunk) = log_stream.next().await {
            match chunk {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                    append_capped(&mut stdout, &message);
                }
                Ok(LogOutput::StdErr { message }) => {
                    append_capped(&mut stderr, &message);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Error reading container logs: {}", e);
                    break;
                }
            }
        }

        Ok((
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(&stderr).into_owned(),
        ))
    }

    /// Force-remove a container, tolerating one that is already gone
    async fn remove_container(&self, container_id: &str) {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };

        match self
            .docker
            .remove_container(container_id, Some(options))
            .await
        {
            Ok(_) => debug!("Removed container {}", container_id),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => debug!("Container {} already removed", container_id),
            Err(e) => warn!("Failed to remove container {}: {}", container_id, e),
        }
    }
}

#[async_trait]
impl ContainerRunner for DockerRunner {
    async fn run(&self, spec: &ContainerSpec) -> Result<ExecOutput> {
        self.ensure_image(&spec.image).await?;

        let container_id = self.create_container(spec).await?;

        if let Err(e) = self
            .docker
            .start_container(&container_id, None::<StartContainerOptions<String>>)
            .await
        {
            self.remove_container(&container_id).await;
            return Err(SandboxError::ContainerStartFailed(e.to_string()));
        }

        let budget = Duration::from_secs(spec.limits.timeout_seconds);
        let exit_code =
            match tokio::time::timeout(budget, self.wait_for_exit(&container_id)).await {
                Ok(Ok(code)) => code,
                Ok(Err(e)) => {
                    self.remove_container(&container_id).await;
                    return Err(e);
                }
                Err(_) => {
                    info!(
                        "Request {} exceeded its {}s budget, killing container",
                        spec.request_id, spec.limits.timeout_seconds
                    );
                    self.remove_container(&container_id).await;
                    return Err(SandboxError::Timeout {
                        seconds: spec.limits.timeout_seconds,
                    });
                }
            };

        let output = self.collect_output(&container_id).await;
        self.remove_container(&container_id).await;
        let (stdout, stderr) = output?;

        Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    async fn sweep_stale(&self, max_age_hours: u64) -> Result<Vec<String>> {
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            vec![format!("{}=true", CORRAL_LABEL)],
        );

        let options = ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        };

        let containers = self.docker.list_containers(Some(options)).await?;

        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let cutoff = now - (max_age_hours as i64 * 3600);

        let mut removed = Vec::new();
        for container in containers {
            if container.state.as_deref() == Some("running") {
                continue;
            }
            let created = container.created.unwrap_or(0);
            if created >= cutoff {
                continue;
            }
            let Some(id) = container.id else { continue };
            info!(
                "Sweeping stale container {} (age {}h)",
                id,
                (now - created) / 3600
            );
            self.remove_container(&id).await;
            removed.push(id);
        }

        Ok(removed)
    }
}

fn append_capped(buffer: &mut Vec<u8>, chunk: &[u8]) {
    let remaining = MAX_CAPTURE_BYTES.saturating_sub(buffer.len());
    let take = remaining.min(chunk.len());
    buffer.extend_from_slice(&chunk[..take]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_capture_is_capped() {
        let mut buffer = Vec::new();
        append_capped(&mut buffer, &vec![b'a'; MAX_CAPTURE_BYTES - 10]);
        append_capped(&mut buffer, &vec![b'b'; 100]);
        assert_eq!(buffer.len(), MAX_CAPTURE_BYTES);
    }

    #[tokio::test]
    #[ignore] // Requires Docker daemon
    async fn connect_docker() {
        let result = DockerRunner::connect().await;
        assert!(result.is_ok(), "Failed to connect to Docker: {:?}", result.err());
    }
}
