use clap::{Parser, Subcommand};
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::sandbox::SandboxCommands;

#[derive(Parser)]
#[command(name = "corral")]
#[command(about = "Corral - filesystem work coordination and sandboxed execution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive finished tasks into the outcome-partitioned archive tree
    Archive {
        /// Worker to archive for; all workers when omitted
        worker: Option<String>,

        /// Archive one specific task instead of sweeping
        #[arg(long)]
        task_id: Option<String>,

        /// Status to archive a result-less task under
        #[arg(long, default_value = "failed")]
        status: corral_queue::FinalStatus,

        /// Sweep everything eligible (the default when no task id is given)
        #[arg(long)]
        auto: bool,
    },
    /// Report worker liveness from heartbeat records
    Health {
        /// Worker to inspect; all known workers when omitted
        worker: Option<String>,
    },
    /// Create a task for a worker
    Task {
        #[command(subcommand)]
        command: cli::task::TaskCommands,
    },
    /// Submit to or run the sandbox execution service
    #[command(subcommand)]
    Sandbox(SandboxCommands),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match handle_command(cli.command).await {
        Ok(_) => {}
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Archive {
            worker,
            task_id,
            status,
            auto,
        } => cli::archive::handle_archive_command(worker, task_id, status, auto).await,
        Commands::Health { worker } => cli::health::handle_health_command(worker).await,
        Commands::Task { command } => cli::task::handle_task_command(command).await,
        Commands::Sandbox(sandbox_cmd) => cli::sandbox::handle_sandbox_command(sandbox_cmd).await,
    }
}
