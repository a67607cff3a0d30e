// ABOUTME: CLI commands for task production
// ABOUTME: Creates task records with paired triggers and optional wake-up notify

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;

use corral_queue::{notifier_from_env, CreateTaskOptions, NotifyOutcome, TaskPriority, TaskStore};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a task and announce it to the worker
    Create {
        /// Worker the task is assigned to
        #[arg(long)]
        worker: String,

        /// Task payload as a JSON document
        #[arg(long, default_value = "{}")]
        payload: String,

        /// Execution budget in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Scheduling hint for the consumer
        #[arg(long, value_enum, default_value = "medium")]
        priority: Priority,

        /// Also send a best-effort wake-up with this message
        #[arg(long)]
        notify: Option<String>,
    },
    /// List a worker's queued task ids
    List {
        #[arg(long)]
        worker: String,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl From<Priority> for TaskPriority {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => TaskPriority::Low,
            Priority::Medium => TaskPriority::Medium,
            Priority::High => TaskPriority::High,
            Priority::Critical => TaskPriority::Critical,
        }
    }
}

pub async fn handle_task_command(command: TaskCommands) -> Result<()> {
    let store = TaskStore::from_env();

    match command {
        TaskCommands::Create {
            worker,
            payload,
            timeout,
            priority,
            notify,
        } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("--payload is not valid JSON")?;

            let options = CreateTaskOptions {
                priority: priority.into(),
                timeout,
                metadata: None,
            };
            let task_id = store
                .create_task(&worker, payload, options)
                .context("Failed to create task")?;
            println!("{} Created task {}", "✓".green(), task_id);

            // The trigger file is authoritative; a failed notify is only a
            // warning and never changes the exit code
            if let Some(message) = notify {
                let notifier = notifier_from_env();
                match notifier.notify(&worker, &message).await {
                    NotifyOutcome::Ok => println!("{} Notified worker {}", "✓".green(), worker),
                    NotifyOutcome::Timeout => {
                        eprintln!("{} Notify timed out for worker {}", "⚠".yellow(), worker)
                    }
                    NotifyOutcome::Error => {
                        eprintln!("{} Notify failed for worker {}", "⚠".yellow(), worker)
                    }
                }
            }
            Ok(())
        }
        TaskCommands::List { worker } => {
            let tasks = store.list_tasks(&worker).context("Failed to list tasks")?;
            if tasks.is_empty() {
                println!("No queued tasks for worker {}", worker.bold());
            } else {
                for task_id in tasks {
                    println!("{}", task_id);
                }
            }
            Ok(())
        }
    }
}
