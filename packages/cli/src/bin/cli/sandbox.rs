// ABOUTME: CLI commands for sandbox submission and the execution service
// ABOUTME: Submit exits by submission success; remote failures are printed, not exit codes

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;

use corral_sandbox::{
    DockerRunner, SandboxClient, SandboxRequest, SandboxResult, SandboxService, ServiceConfig,
    WaitOutcome,
};

#[derive(Subcommand)]
pub enum SandboxCommands {
    /// Submit a command for isolated execution
    Submit {
        /// Container image (must be on the service allow-list)
        #[arg(long)]
        image: String,

        /// Shell command to run inside the container
        #[arg(long)]
        command: String,

        /// File to materialize into the workspace: NAME CONTENT
        #[arg(long = "file", num_args = 2, value_names = ["NAME", "CONTENT"])]
        files: Vec<String>,

        /// Wall-clock budget in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Memory ceiling in megabytes
        #[arg(long)]
        memory: Option<u64>,

        /// CPU-share ceiling in cores
        #[arg(long)]
        cpu: Option<f64>,

        /// Submit without waiting for the result
        #[arg(long)]
        no_wait: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the sandbox execution service (configured from the environment)
    Serve,
}

pub async fn handle_sandbox_command(command: SandboxCommands) -> Result<()> {
    match command {
        SandboxCommands::Submit {
            image,
            command,
            files,
            timeout,
            memory,
            cpu,
            no_wait,
            json,
        } => submit(image, command, files, timeout, memory, cpu, no_wait, json).await,
        SandboxCommands::Serve => serve().await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn submit(
    image: String,
    command: String,
    files: Vec<String>,
    timeout: Option<u64>,
    memory: Option<u64>,
    cpu: Option<f64>,
    no_wait: bool,
    json: bool,
) -> Result<()> {
    let mut request = SandboxRequest::new(image, command);
    request.timeout = timeout;
    request.memory_limit = memory;
    request.cpu_limit = cpu;
    for pair in files.chunks(2) {
        if let [name, content] = pair {
            request.files.insert(name.clone(), content.clone());
        }
    }

    let client = SandboxClient::from_env();
    let request_id = client
        .submit(&request)
        .context("Failed to submit sandbox request")?;

    if no_wait {
        if json {
            println!("{}", serde_json::json!({ "request_id": request_id }));
        } else {
            println!("{} Submitted request {}", "✓".green(), request_id);
        }
        return Ok(());
    }

    let budget = Duration::from_secs(request.limits().timeout_seconds);
    let outcome = client
        .wait_for_result(&request_id, budget)
        .await
        .context("Failed while waiting for the result")?;

    match outcome {
        WaitOutcome::Completed(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
        WaitOutcome::Unknown => {
            // Distinct from failure: the request may still be executing
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "request_id": request_id, "outcome": "unknown" })
                );
            } else {
                println!(
                    "{} No result for {} within the wait budget; outcome unknown",
                    "⚠".yellow(),
                    request_id
                );
            }
        }
    }

    Ok(())
}

fn print_result(result: &SandboxResult) {
    if result.success {
        println!(
            "{} Request {} succeeded in {:.2}s",
            "✓".green(),
            result.request_id,
            result.execution_time
        );
    } else {
        println!(
            "{} Request {} failed (exit_code: {:?})",
            "✗".red(),
            result.request_id,
            result.exit_code
        );
        if let Some(error) = &result.error {
            println!("{} {}", "error:".red(), error);
        }
    }

    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
    }
}

async fn serve() -> Result<()> {
    let config = ServiceConfig::from_env();
    let runner = DockerRunner::connect()
        .await
        .context("Failed to connect to the Docker daemon")?;

    let service = SandboxService::new(config, Arc::new(runner));
    service.run().await.context("Sandbox service failed")?;
    Ok(())
}
