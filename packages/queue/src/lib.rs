// ABOUTME: Filesystem-coordinated task queue for loosely-coupled workers
// ABOUTME: Task/trigger store, notifier bridge, liveness monitor, and archiver

pub mod archiver;
pub mod error;
pub mod heartbeat;
pub mod notify;
pub mod storage;
pub mod store;
pub mod types;

pub use archiver::{ArchiveStats, Archiver};
pub use error::{QueueError, Result};
pub use heartbeat::HeartbeatMonitor;
pub use notify::{notifier_from_env, CommandNotifier, LogNotifier, Notifier, NotifyOutcome};
pub use store::{CreateTaskOptions, QueueLayout, TaskStore};
pub use types::{
    FinalStatus, Heartbeat, Liveness, ResultStatus, Task, TaskPriority, TaskResult, WorkerHealth,
};
