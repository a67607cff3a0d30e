// ABOUTME: Archiver and dead-letter manager for completed tasks
// ABOUTME: Reconciles task+result pairs into the archive tree, partitioned by outcome

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{QueueError, Result};
use crate::storage;
use crate::store::TaskStore;
use crate::types::{FinalStatus, Task, TaskResult};

/// Aggregate counts from an archival sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Tasks archived this sweep
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    /// Tasks skipped because of per-item I/O or parse errors
    pub skipped: u64,
    pub by_worker: HashMap<String, u64>,
}

/// Moves finished tasks out of the active queue
///
/// A task is eligible for the sweep only once its result carries a known
/// terminal status; unknown or pending statuses leave the task queued for a
/// future reconciliation rather than being silently discarded. Both archive
/// writes must land before the source task is deleted, so a crash mid-archive
/// self-heals on the next run.
pub struct Archiver {
    store: TaskStore,
    purge_results: bool,
}

impl Archiver {
    pub fn new(store: TaskStore) -> Self {
        Self {
            store,
            purge_results: false,
        }
    }

    /// Also delete the live result file once its archive copy exists
    pub fn purge_results(mut self, purge: bool) -> Self {
        self.purge_results = purge;
        self
    }

    /// Archive one task explicitly
    ///
    /// Uses the result's status when one exists with a known terminal state;
    /// otherwise falls back to `default_status` (the manual dead-letter
    /// path). Returns `Ok(true)` once the task has been archived.
    pub fn archive_task(
        &self,
        worker: &str,
        task_id: &str,
        default_status: FinalStatus,
    ) -> Result<bool> {
        let task = self.store.load_task(worker, task_id)?;
        let result = self.store.read_result(worker, task_id)?;

        let status = result
            .as_ref()
            .and_then(|r| r.result_status().final_status())
            .unwrap_or(default_status);

        self.move_to_archive(worker, &task, result.as_ref(), status)?;
        Ok(true)
    }

    /// Sweep all workers (or one) for archivable tasks
    ///
    /// Only tasks that already have a result with a known terminal status are
    /// touched, so the sweep is safe to run concurrently with task creation:
    /// an in-flight task is at worst missed and picked up next run. Per-item
    /// errors are logged, counted as skipped, and never abort the sweep.
    pub fn archive_all(&self, worker: Option<&str>) -> Result<ArchiveStats> {
        let workers = match worker {
            Some(name) => vec![name.to_string()],
            None => self.store.workers()?,
        };

        let mut stats = ArchiveStats::default();

        for worker in &workers {
            let files = match self.store.task_files(worker) {
                Ok(files) => files,
                Err(e) => {
                    warn!("Skipping worker {}: cannot scan tasks: {}", worker, e);
                    stats.skipped += 1;
                    continue;
                }
            };

            for path in files {
                let Some(task_id) = path.file_stem().map(|s| s.to_string_lossy().into_owned())
                else {
                    continue;
                };

                match self.sweep_one(worker, &task_id) {
                    Ok(Some(status)) => {
                        stats.total += 1;
                        match status {
                            FinalStatus::Success => stats.success += 1,
                            FinalStatus::Failed => stats.failed += 1,
                        }
                        *stats.by_worker.entry(worker.clone()).or_insert(0) += 1;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Skipping task {} (worker {}): {}", task_id, worker, e);
                        stats.skipped += 1;
                    }
                }
            }
        }

        info!(
            "Archive sweep complete: {} archived ({} success, {} failed), {} skipped",
            stats.total, stats.success, stats.failed, stats.skipped
        );
        Ok(stats)
    }

    /// Archive a single task if it is eligible, returning its outcome
    fn sweep_one(&self, worker: &str, task_id: &str) -> Result<Option<FinalStatus>> {
        let Some(result) = self.store.read_result(worker, task_id)? else {
            return Ok(None);
        };

        let Some(status) = result.result_status().final_status() else {
            debug!(
                "Leaving task {} unarchived: result status {:?} is not terminal",
                task_id, result.status
            );
            return Ok(None);
        };

        // The task can vanish between the scan and this read if a concurrent
        // sweep already archived it; that is a no-op, not an error.
        let task = match self.store.load_task(worker, task_id) {
            Ok(task) => task,
            Err(QueueError::TaskNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        self.move_to_archive(worker, &task, Some(&result), status)?;
        Ok(Some(status))
    }

    /// Write archive copies, then delete the source task
    ///
    /// Ordering is the invariant: both archive writes succeed before anything
    /// is removed, so a partial archive (task present, result missing) cannot
    /// be observed in the archive tree.
    fn move_to_archive(
        &self,
        worker: &str,
        task: &Task,
        result: Option<&TaskResult>,
        status: FinalStatus,
    ) -> Result<()> {
        let mut archived = task.clone();
        archived.archived_at = Some(Utc::now());
        archived.archive_status = Some(status);

        storage::write_json_atomic(&self.archive_task_path(worker, status, &task.task_id), &archived)?;
        if let Some(result) = result {
            storage::write_json_atomic(
                &self.archive_result_path(worker, status, &task.task_id),
                result,
            )?;
        }

        remove_if_exists(&self.store.task_path(worker, &task.task_id))?;
        self.store.remove_trigger(worker, &task.task_id)?;
        if self.purge_results && result.is_some() {
            remove_if_exists(&self.store.result_path(worker, &task.task_id))?;
        }

        info!(
            "Archived task {} (worker {}) as {}",
            task.task_id, worker, status
        );
        Ok(())
    }

    fn archive_task_path(&self, worker: &str, status: FinalStatus, task_id: &str) -> PathBuf {
        self.store
            .layout()
            .archive
            .join(worker)
            .join(status.dir_name())
            .join(format!("{}.json", task_id))
    }

    fn archive_result_path(&self, worker: &str, status: FinalStatus, task_id: &str) -> PathBuf {
        self.store
            .layout()
            .archive
            .join(worker)
            .join(status.dir_name())
            .join(format!("{}-result.json", task_id))
    }
}

fn remove_if_exists(path: &std::path::Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
