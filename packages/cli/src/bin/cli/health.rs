// ABOUTME: CLI command for worker liveness reporting
// ABOUTME: Prints heartbeat staleness; callers apply their own thresholds

use anyhow::{Context, Result};
use colored::*;

use corral_queue::{HeartbeatMonitor, Liveness, QueueLayout, WorkerHealth};

pub async fn handle_health_command(worker: Option<String>) -> Result<()> {
    let layout = QueueLayout::from_env();
    let monitor = HeartbeatMonitor::new(layout.heartbeats);

    let reports = match worker {
        Some(worker) => vec![monitor
            .health(&worker)
            .with_context(|| format!("Failed to read heartbeat for {}", worker))?],
        None => monitor.health_all().context("Failed to scan heartbeats")?,
    };

    if reports.is_empty() {
        println!("No heartbeats recorded");
        return Ok(());
    }

    for report in reports {
        print_health(&report);
    }
    Ok(())
}

fn print_health(health: &WorkerHealth) {
    match health.liveness {
        Liveness::Offline => {
            println!("{} {} {}", "●".red(), health.worker.bold(), "OFFLINE".red());
        }
        Liveness::Online => {
            println!(
                "{} {} {} (queue: {}, last seen {:.1}s ago)",
                "●".green(),
                health.worker.bold(),
                health.reported_status.as_deref().unwrap_or("unknown"),
                health.queue_size.unwrap_or(0),
                health.staleness_secs.unwrap_or(0.0)
            );
        }
    }
}
