// ABOUTME: Core record types for the filesystem queue
// ABOUTME: Defines tasks, results, status normalization, and heartbeat records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task priority, informational for consumers that sort their queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A unit of work assigned to a specific worker
///
/// Immutable once created. The producer owns the record until a worker picks
/// it up; only the archiver removes it, and only after a result exists (or an
/// operator forces archival).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique, lexically sortable id (`<worker>-<timestamp>-<suffix>`)
    pub task_id: String,
    /// Worker this task is assigned to
    pub worker: String,
    /// Opaque work description, interpreted by the worker
    pub payload: serde_json::Value,
    /// Creation timestamp (ISO 8601 UTC)
    pub created_at: DateTime<Utc>,
    /// Scheduling hint for the consumer
    #[serde(default)]
    pub priority: TaskPriority,
    /// Execution budget in seconds, enforced by the worker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Additional structured metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Archival timestamp, present only on archived copies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    /// Outcome the task was archived under, present only on archived copies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_status: Option<FinalStatus>,
}

/// Result record written by the worker that executed a task
///
/// `status` is carried as the raw string found on disk; callers normalize it
/// through [`ResultStatus::parse`] rather than matching strings themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: Option<i64>,
    /// Wall-clock execution time in seconds
    #[serde(default)]
    pub execution_time: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl TaskResult {
    /// Normalized view of the raw status string
    pub fn result_status(&self) -> ResultStatus {
        ResultStatus::parse(&self.status)
    }
}

/// Closed status enumeration for results, validated at the boundary
///
/// Unknown strings map to [`ResultStatus::Unknown`] so they are a first-class
/// state rather than an implicit fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    Pending,
    Success,
    Failed,
    Error,
    Unknown,
}

impl ResultStatus {
    /// Normalize a raw status string; `complete`/`completed` count as success
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => ResultStatus::Pending,
            "success" | "complete" | "completed" => ResultStatus::Success,
            "failed" => ResultStatus::Failed,
            "error" => ResultStatus::Error,
            _ => ResultStatus::Unknown,
        }
    }

    /// Archive partition this status resolves to, if any
    ///
    /// `Pending` and `Unknown` have no final status: tasks carrying them stay
    /// in the active queue.
    pub fn final_status(self) -> Option<FinalStatus> {
        match self {
            ResultStatus::Success => Some(FinalStatus::Success),
            ResultStatus::Failed | ResultStatus::Error => Some(FinalStatus::Failed),
            ResultStatus::Pending | ResultStatus::Unknown => None,
        }
    }
}

/// Final outcome a task is archived under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalStatus {
    Success,
    Failed,
}

impl FinalStatus {
    /// Archive subdirectory name for this outcome
    pub fn dir_name(self) -> &'static str {
        match self {
            FinalStatus::Success => "success",
            FinalStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for FinalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match ResultStatus::parse(s).final_status() {
            Some(status) => Ok(status),
            None => Err(format!(
                "expected success, failed, or completed, got {:?}",
                s
            )),
        }
    }
}

impl std::fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A worker's self-reported liveness snapshot, overwritten each period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub worker: String,
    /// Worker-reported state, e.g. "idle" or "busy"
    pub status: String,
    /// Number of tasks the worker currently sees queued
    pub queue_size: u64,
    pub timestamp: DateTime<Utc>,
}

/// Liveness as derived from heartbeat presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Online,
    Offline,
}

/// Health view of a single worker
///
/// Staleness is the only failure signal; callers apply their own thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerHealth {
    pub worker: String,
    pub liveness: Liveness,
    /// Last status the worker reported, absent when offline
    pub reported_status: Option<String>,
    pub queue_size: Option<u64>,
    /// Seconds since the last heartbeat, absent when offline
    pub staleness_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_normalization_covers_aliases() {
        assert_eq!(ResultStatus::parse("success"), ResultStatus::Success);
        assert_eq!(ResultStatus::parse("complete"), ResultStatus::Success);
        assert_eq!(ResultStatus::parse("Completed"), ResultStatus::Success);
        assert_eq!(ResultStatus::parse("failed"), ResultStatus::Failed);
        assert_eq!(ResultStatus::parse("error"), ResultStatus::Error);
        assert_eq!(ResultStatus::parse("pending"), ResultStatus::Pending);
        assert_eq!(ResultStatus::parse("weird"), ResultStatus::Unknown);
    }

    #[test]
    fn only_terminal_statuses_resolve_to_a_partition() {
        assert_eq!(
            ResultStatus::Success.final_status(),
            Some(FinalStatus::Success)
        );
        assert_eq!(
            ResultStatus::Error.final_status(),
            Some(FinalStatus::Failed)
        );
        assert_eq!(ResultStatus::Pending.final_status(), None);
        assert_eq!(ResultStatus::Unknown.final_status(), None);
    }

    #[test]
    fn final_status_parses_cli_spellings() {
        assert_eq!("success".parse::<FinalStatus>(), Ok(FinalStatus::Success));
        assert_eq!("completed".parse::<FinalStatus>(), Ok(FinalStatus::Success));
        assert_eq!("failed".parse::<FinalStatus>(), Ok(FinalStatus::Failed));
        assert!("weird".parse::<FinalStatus>().is_err());
    }
}
