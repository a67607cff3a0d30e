// ABOUTME: Long-running sandbox service: watches the request spool and executes
// ABOUTME: Bounded-concurrency scan loop with per-request error isolation

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use corral_config::{constants, dir_or_default, list_or_default, u64_or_default};
use corral_queue::storage;

use crate::error::{Result, SandboxError};
use crate::runner::{ContainerRunner, ContainerSpec};
use crate::scratch::ScratchDir;
use crate::types::{SandboxRequest, SandboxResult};
use crate::validate::validate_request;

/// Images permitted when `CORRAL_SANDBOX_ALLOWED_IMAGES` is unset
pub const DEFAULT_ALLOWED_IMAGES: &[&str] =
    &["python:3.11", "python:3.12", "node:20", "alpine:3.19"];

/// Service configuration, resolved from the environment in production
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub requests_dir: PathBuf,
    pub results_dir: PathBuf,
    /// Parent directory for per-request scratch directories
    pub scratch_dir: PathBuf,
    /// Exact-match image allow-list
    pub allowed_images: Vec<String>,
    pub poll_interval: Duration,
    /// Minimum request-file age before it is read, so a file still being
    /// written is never picked up
    pub settle: Duration,
    pub max_concurrent: usize,
    /// Interval of the stale-container sweep
    pub cleanup_interval: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self {
            requests_dir: dir_or_default(
                constants::CORRAL_SANDBOX_REQUESTS_DIR,
                "sandbox-requests",
            ),
            results_dir: dir_or_default(constants::CORRAL_SANDBOX_RESULTS_DIR, "sandbox-results"),
            scratch_dir: std::env::var(constants::CORRAL_SANDBOX_SCRATCH_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            allowed_images: list_or_default(
                constants::CORRAL_SANDBOX_ALLOWED_IMAGES,
                DEFAULT_ALLOWED_IMAGES,
            ),
            poll_interval: Duration::from_millis(u64_or_default(
                constants::CORRAL_SANDBOX_POLL_INTERVAL_MS,
                2000,
            )),
            settle: Duration::from_millis(u64_or_default(constants::CORRAL_SANDBOX_SETTLE_MS, 500)),
            max_concurrent: u64_or_default(constants::CORRAL_SANDBOX_MAX_CONCURRENT, 4).max(1)
                as usize,
            cleanup_interval: Duration::from_secs(
                u64_or_default(constants::CORRAL_SANDBOX_CLEANUP_INTERVAL_MINUTES, 5) * 60,
            ),
        }
    }
}

/// Watches the request spool and runs each request in its own container
///
/// One request file maps to one container, created and destroyed per request.
/// Requests are processed independently: a bad request never aborts the scan,
/// and infrastructure failures leave the request file in place for the next
/// pass.
pub struct SandboxService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    config: ServiceConfig,
    runner: Arc<dyn ContainerRunner>,
    semaphore: Arc<Semaphore>,
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl SandboxService {
    pub fn new(config: ServiceConfig, runner: Arc<dyn ContainerRunner>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        Self {
            inner: Arc::new(ServiceInner {
                config,
                runner,
                semaphore,
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Run the scan loop forever
    pub async fn run(&self) -> Result<()> {
        fs::create_dir_all(&self.inner.config.requests_dir)?;
        fs::create_dir_all(&self.inner.config.results_dir)?;

        info!(
            "Sandbox service watching {} (allowed images: {})",
            self.inner.config.requests_dir.display(),
            self.inner.config.allowed_images.join(", ")
        );

        self.spawn_stale_sweep();

        let mut interval = tokio::time::interval(self.inner.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if let Err(e) = self.scan_once().await {
                error!("Request scan failed: {}", e);
            }
        }
    }

    /// One pass over the spool; returns how many requests were dispatched
    pub async fn scan_once(&self) -> Result<usize> {
        self.inner.clone().scan_once().await
    }

    fn spawn_stale_sweep(&self) {
        let runner = self.inner.runner.clone();
        let interval_duration = self.inner.config.cleanup_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval_duration);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                match runner.sweep_stale(24).await {
                    Ok(removed) if !removed.is_empty() => {
                        info!("Swept {} stale container(s)", removed.len());
                    }
                    Ok(_) => {}
                    Err(e) => error!("Stale container sweep failed: {}", e),
                }
            }
        });
    }
}

impl ServiceInner {
    async fn scan_once(self: Arc<Self>) -> Result<usize> {
        let mut dispatched = 0;

        for path in storage::scan_files(&self.config.requests_dir, "json")? {
            if !is_settled(&path, self.config.settle) {
                continue;
            }

            {
                let mut in_flight = self.in_flight.lock().await;
                if !in_flight.insert(path.clone()) {
                    continue;
                }
            }

            let inner = self.clone();
            tokio::spawn(async move {
                inner.process(path).await;
            });
            dispatched += 1;
        }

        Ok(dispatched)
    }

    async fn process(self: Arc<Self>, path: PathBuf) {
        // The semaphore is never closed, so acquisition cannot fail
        let permit = self.semaphore.clone().acquire_owned().await.ok();

        if let Err(e) = self.handle_request_file(&path).await {
            if e.is_infrastructure() {
                warn!(
                    "Leaving request {} for retry on the next scan: {}",
                    path.display(),
                    e
                );
            } else {
                error!("Request {} failed: {}", path.display(), e);
            }
        }

        drop(permit);
        self.in_flight.lock().await.remove(&path);
    }

    /// Process one settled request file through the full pipeline
    async fn handle_request_file(&self, path: &Path) -> Result<()> {
        let request: SandboxRequest = match storage::read_json(path) {
            Ok(request) => request,
            Err(e) => {
                // Settled but unreadable: reject it under the file stem so
                // the submitter gets an answer instead of an endless retry
                let request_id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "unknown".to_string());
                warn!("Malformed request {}: {}", path.display(), e);
                self.finish(
                    path,
                    &SandboxResult::rejected(&request_id, format!("malformed request: {}", e)),
                )?;
                return Ok(());
            }
        };

        if let Err(e) = validate_request(&request, &self.config.allowed_images) {
            info!("Rejected request {}: {}", request.request_id, e);
            self.finish(path, &SandboxResult::rejected(&request.request_id, e.to_string()))?;
            return Ok(());
        }

        let scratch =
            ScratchDir::materialize(&self.config.scratch_dir, &request.request_id, &request.files)?;

        let spec = ContainerSpec {
            request_id: request.request_id.clone(),
            image: request.image.clone(),
            command: request.command.clone(),
            scratch_dir: scratch.path().to_path_buf(),
            limits: request.limits(),
        };

        debug!(
            "Executing request {} in image {}",
            request.request_id, request.image
        );
        let started = Instant::now();

        let result = match self.runner.run(&spec).await {
            Ok(output) => SandboxResult::from_exec(
                &request.request_id,
                output,
                started.elapsed().as_secs_f64(),
            ),
            Err(SandboxError::Timeout { seconds }) => {
                SandboxResult::timed_out(&request.request_id, seconds)
            }
            Err(e) if e.is_infrastructure() => return Err(e),
            Err(e) => SandboxResult::rejected(&request.request_id, e.to_string()),
        };

        drop(scratch);

        info!(
            "Request {} finished (success={}, exit_code={:?})",
            request.request_id, result.success, result.exit_code
        );
        self.finish(path, &result)
    }

    /// Durably write the result, then delete the request file
    fn finish(&self, request_path: &Path, result: &SandboxResult) -> Result<()> {
        let result_path = self
            .config
            .results_dir
            .join(format!("{}.json", result.request_id));
        storage::write_json_atomic(&result_path, result)?;

        match fs::remove_file(request_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_settled(path: &Path, settle: Duration) -> bool {
    if settle.is_zero() {
        return true;
    }
    path.metadata()
        .and_then(|m| m.modified())
        .and_then(|mtime| mtime.elapsed().map_err(|e| std::io::Error::other(e)))
        .map(|age| age >= settle)
        .unwrap_or(false)
}
