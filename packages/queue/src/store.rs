// ABOUTME: Task and trigger store over the shared filesystem tree
// ABOUTME: Creates immutable task records with paired wake-up markers

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use corral_config::{constants, dir_or_default};

use crate::error::{QueueError, Result};
use crate::storage::{self, ScanDir};
use crate::types::{Task, TaskPriority, TaskResult};

/// Directory roots of the queue tree
#[derive(Debug, Clone)]
pub struct QueueLayout {
    pub tasks: PathBuf,
    pub triggers: PathBuf,
    pub results: PathBuf,
    pub heartbeats: PathBuf,
    pub archive: PathBuf,
}

impl QueueLayout {
    /// Resolve every root from the environment
    pub fn from_env() -> Self {
        Self {
            tasks: dir_or_default(constants::CORRAL_TASKS_DIR, "tasks"),
            triggers: dir_or_default(constants::CORRAL_TRIGGERS_DIR, "triggers"),
            results: dir_or_default(constants::CORRAL_RESULTS_DIR, "results"),
            heartbeats: dir_or_default(constants::CORRAL_HEARTBEATS_DIR, "heartbeats"),
            archive: dir_or_default(constants::CORRAL_ARCHIVE_DIR, "archive"),
        }
    }

    /// Place every root under a single parent directory
    pub fn under(root: &Path) -> Self {
        Self {
            tasks: root.join("tasks"),
            triggers: root.join("triggers"),
            results: root.join("results"),
            heartbeats: root.join("heartbeats"),
            archive: root.join("archive"),
        }
    }
}

/// Options for task creation
#[derive(Debug, Clone, Default)]
pub struct CreateTaskOptions {
    pub priority: TaskPriority,
    /// Execution budget in seconds
    pub timeout: Option<u64>,
    pub metadata: Option<serde_json::Value>,
}

/// Store for task records and their paired trigger markers
#[derive(Debug, Clone)]
pub struct TaskStore {
    layout: QueueLayout,
}

impl TaskStore {
    pub fn new(layout: QueueLayout) -> Self {
        Self { layout }
    }

    pub fn from_env() -> Self {
        Self::new(QueueLayout::from_env())
    }

    pub fn layout(&self) -> &QueueLayout {
        &self.layout
    }

    /// Create a task record and announce it with a trigger marker
    ///
    /// The task is written first, then the trigger, so a trigger never exists
    /// without its task. Trigger creation failure is a logged degraded mode,
    /// not an error: the task stays durable and workers fall back to
    /// periodically listing their task directory.
    pub fn create_task(
        &self,
        worker: &str,
        payload: serde_json::Value,
        options: CreateTaskOptions,
    ) -> Result<String> {
        validate_worker(worker)?;

        let task_id = generate_task_id(worker);
        let task = Task {
            task_id: task_id.clone(),
            worker: worker.to_string(),
            payload,
            created_at: Utc::now(),
            priority: options.priority,
            timeout: options.timeout,
            metadata: options.metadata,
            archived_at: None,
            archive_status: None,
        };

        storage::write_json_atomic(&self.task_path(worker, &task_id), &task)?;

        if let Err(e) = storage::touch_marker(&self.trigger_path(worker, &task_id)) {
            warn!(
                "Trigger creation failed for task {} (worker {}): {}; \
                 worker must fall back to directory polling",
                task_id, worker, e
            );
        } else {
            debug!("Created task {} for worker {}", task_id, worker);
        }

        Ok(task_id)
    }

    /// Load a task record
    pub fn load_task(&self, worker: &str, task_id: &str) -> Result<Task> {
        validate_worker(worker)?;
        let path = self.task_path(worker, task_id);
        if !path.is_file() {
            return Err(QueueError::TaskNotFound(task_id.to_string()));
        }
        storage::read_json(&path)
    }

    /// Ids of the worker's queued tasks, in lexical (FIFO-ish) order
    pub fn list_tasks(&self, worker: &str) -> Result<Vec<String>> {
        validate_worker(worker)?;
        Ok(self
            .task_files(worker)?
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect())
    }

    /// Ordered scan over the worker's task record files
    pub fn task_files(&self, worker: &str) -> Result<ScanDir> {
        storage::scan_files(&self.layout.tasks.join(worker), "json")
    }

    /// Workers that currently have a task directory
    pub fn workers(&self) -> Result<Vec<String>> {
        storage::scan_subdirs(&self.layout.tasks)
    }

    /// Remove a task's trigger marker, reporting whether one existed
    ///
    /// Used by workers to consume an observed trigger, and by producers to
    /// withdraw a task before pickup (racy by design: the worker may already
    /// have observed it).
    pub fn remove_trigger(&self, worker: &str, task_id: &str) -> Result<bool> {
        validate_worker(worker)?;
        let path = self.trigger_path(worker, task_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the task's trigger marker is still present
    pub fn trigger_exists(&self, worker: &str, task_id: &str) -> bool {
        self.trigger_path(worker, task_id).is_file()
    }

    /// Read the result for a task, if the worker has written one
    pub fn read_result(&self, worker: &str, task_id: &str) -> Result<Option<TaskResult>> {
        validate_worker(worker)?;
        let path = self.result_path(worker, task_id);
        if !path.is_file() {
            return Ok(None);
        }
        storage::read_json(&path).map(Some)
    }

    /// Write a result record for a task
    ///
    /// Workers are external to this crate in production; this is here for
    /// producers acting as their own consumer and for tests.
    pub fn write_result(&self, worker: &str, result: &TaskResult) -> Result<()> {
        validate_worker(worker)?;
        storage::write_json_atomic(&self.result_path(worker, &result.task_id), result)
    }

    pub fn task_path(&self, worker: &str, task_id: &str) -> PathBuf {
        self.layout
            .tasks
            .join(worker)
            .join(format!("{}.json", task_id))
    }

    pub fn trigger_path(&self, worker: &str, task_id: &str) -> PathBuf {
        self.layout
            .triggers
            .join(worker)
            .join(format!("task-{}.trigger", task_id))
    }

    pub fn result_path(&self, worker: &str, task_id: &str) -> PathBuf {
        self.layout
            .results
            .join(worker)
            .join(format!("{}-result.json", task_id))
    }
}

/// Generate a per-worker-unique, lexically sortable task id
///
/// Microsecond UTC timestamp gives the ordering; the uuid suffix breaks ties
/// within the same microsecond.
fn generate_task_id(worker: &str) -> String {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%6fZ");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", worker, stamp, &suffix[..8])
}

fn validate_worker(worker: &str) -> Result<()> {
    if worker.is_empty()
        || worker.contains('/')
        || worker.contains('\\')
        || worker.starts_with('.')
    {
        return Err(QueueError::InvalidWorker(worker.to_string()));
    }
    Ok(())
}
