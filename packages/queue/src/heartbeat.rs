// ABOUTME: Worker liveness tracking via overwritten heartbeat records
// ABOUTME: Staleness computation only; callers decide their own thresholds

use std::path::PathBuf;

use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::storage;
use crate::types::{Heartbeat, Liveness, WorkerHealth};

/// Records and inspects per-worker heartbeat files
///
/// One record per worker, last-write-wins, no history. A missing record is
/// the only death signal; nothing here enforces a polling interval.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    dir: PathBuf,
}

impl HeartbeatMonitor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Overwrite the worker's heartbeat with a fresh snapshot
    pub fn record(&self, worker: &str, status: &str, queue_size: u64) -> Result<()> {
        let heartbeat = Heartbeat {
            worker: worker.to_string(),
            status: status.to_string(),
            queue_size,
            timestamp: Utc::now(),
        };
        storage::write_json_atomic(&self.path(worker), &heartbeat)?;
        debug!("Recorded heartbeat for worker {}", worker);
        Ok(())
    }

    /// Health view for one worker; `Offline` when no record exists
    pub fn health(&self, worker: &str) -> Result<WorkerHealth> {
        let path = self.path(worker);
        if !path.is_file() {
            return Ok(WorkerHealth {
                worker: worker.to_string(),
                liveness: Liveness::Offline,
                reported_status: None,
                queue_size: None,
                staleness_secs: None,
            });
        }

        let heartbeat: Heartbeat = storage::read_json(&path)?;
        let staleness = (Utc::now() - heartbeat.timestamp)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0;

        Ok(WorkerHealth {
            worker: worker.to_string(),
            liveness: Liveness::Online,
            reported_status: Some(heartbeat.status),
            queue_size: Some(heartbeat.queue_size),
            staleness_secs: Some(staleness),
        })
    }

    /// Health for every worker that has ever recorded a heartbeat
    pub fn health_all(&self) -> Result<Vec<WorkerHealth>> {
        let mut all = Vec::new();
        for path in storage::scan_files(&self.dir, "json")? {
            if let Some(worker) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) {
                all.push(self.health(&worker)?);
            }
        }
        Ok(all)
    }

    fn path(&self, worker: &str) -> PathBuf {
        self.dir.join(format!("{}.json", worker))
    }
}
