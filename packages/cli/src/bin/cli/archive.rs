// ABOUTME: CLI command for archiving finished tasks
// ABOUTME: Single-task archival (exit 1 on failure) and the eligible-task sweep

use anyhow::{bail, Context, Result};
use colored::*;

use corral_queue::{Archiver, FinalStatus, TaskStore};

pub async fn handle_archive_command(
    worker: Option<String>,
    task_id: Option<String>,
    status: FinalStatus,
    _auto: bool,
) -> Result<()> {
    let store = TaskStore::from_env();
    let archiver = Archiver::new(store);

    if let Some(task_id) = task_id {
        let Some(worker) = worker else {
            bail!("--task-id requires a worker name");
        };

        archiver
            .archive_task(&worker, &task_id, status)
            .with_context(|| format!("Failed to archive task {}", task_id))?;
        println!(
            "{} Archived task {} for worker {}",
            "✓".green(),
            task_id,
            worker
        );
        return Ok(());
    }

    let stats = archiver
        .archive_all(worker.as_deref())
        .context("Archive sweep failed")?;

    println!(
        "{} Archived {} task(s): {} success, {} failed, {} skipped",
        "✓".green(),
        stats.total,
        stats.success.to_string().green(),
        stats.failed.to_string().red(),
        stats.skipped
    );

    let mut workers: Vec<_> = stats.by_worker.iter().collect();
    workers.sort();
    for (worker, count) in workers {
        println!("  {}: {}", worker.bold(), count);
    }

    Ok(())
}
