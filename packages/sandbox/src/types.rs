// ABOUTME: Request and result records for sandboxed command execution
// ABOUTME: Defines resource limits and the on-disk submission/outcome formats

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resource ceilings for one sandboxed execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Memory limit in megabytes
    pub memory_mb: u64,
    /// CPU cores (fractional allowed, e.g. 0.5 for half a core)
    pub cpu_cores: f64,
    /// Maximum wall-clock execution time in seconds
    pub timeout_seconds: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_mb: 512,
            cpu_cores: 1.0,
            timeout_seconds: 60,
        }
    }
}

/// Submission record for isolated command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxRequest {
    /// Unique request id, also the spool file name
    pub request_id: String,
    /// Container image, must match the service allow-list exactly
    pub image: String,
    /// Shell command executed as `/bin/sh -c <command>`
    pub command: String,
    /// Files materialized into the scratch directory before execution,
    /// relative name to content
    #[serde(default)]
    pub files: HashMap<String, String>,
    /// Wall-clock budget in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Memory ceiling in megabytes
    #[serde(default)]
    pub memory_limit: Option<u64>,
    /// CPU-share ceiling in cores
    #[serde(default)]
    pub cpu_limit: Option<f64>,
    pub submitted_at: DateTime<Utc>,
}

impl SandboxRequest {
    pub fn new(image: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().simple().to_string(),
            image: image.into(),
            command: command.into(),
            files: HashMap::new(),
            timeout: None,
            memory_limit: None,
            cpu_limit: None,
            submitted_at: Utc::now(),
        }
    }

    /// Effective limits after applying defaults
    pub fn limits(&self) -> ResourceLimits {
        let defaults = ResourceLimits::default();
        ResourceLimits {
            memory_mb: self.memory_limit.unwrap_or(defaults.memory_mb),
            cpu_cores: self.cpu_limit.unwrap_or(defaults.cpu_cores),
            timeout_seconds: self.timeout.unwrap_or(defaults.timeout_seconds),
        }
    }
}

/// Captured output of a finished container run
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

/// Outcome record written once per request; the submitter deletes it after
/// reading (the result spool is not an audit log)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxResult {
    pub request_id: String,
    /// `true` iff the command ran and exited zero
    pub success: bool,
    pub exit_code: Option<i64>,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock seconds; on timeout this is the configured budget, the
    /// post-kill elapsed time is not separately tracked
    pub execution_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SandboxResult {
    /// Result for a run that produced an exit code
    pub fn from_exec(request_id: &str, output: ExecOutput, execution_time: f64) -> Self {
        Self {
            request_id: request_id.to_string(),
            success: output.exit_code == 0,
            exit_code: Some(output.exit_code),
            stdout: output.stdout,
            stderr: output.stderr,
            execution_time,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Result for a request rejected before any container existed
    pub fn rejected(request_id: &str, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.to_string(),
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            execution_time: 0.0,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    /// Result for an execution killed at its wall-clock budget
    pub fn timed_out(request_id: &str, seconds: u64) -> Self {
        Self {
            request_id: request_id.to_string(),
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            execution_time: seconds as f64,
            error: Some(format!("execution timed out after {} seconds", seconds)),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_apply_defaults_per_field() {
        let mut request = SandboxRequest::new("alpine:3.19", "true");
        request.memory_limit = Some(128);

        let limits = request.limits();
        assert_eq!(limits.memory_mb, 128);
        assert_eq!(limits.cpu_cores, ResourceLimits::default().cpu_cores);
        assert_eq!(
            limits.timeout_seconds,
            ResourceLimits::default().timeout_seconds
        );
    }

    #[test]
    fn success_mirrors_exit_code() {
        let ok = SandboxResult::from_exec(
            "r1",
            ExecOutput {
                exit_code: 0,
                stdout: "4\n".to_string(),
                stderr: String::new(),
            },
            0.2,
        );
        assert!(ok.success);

        let bad = SandboxResult::from_exec(
            "r1",
            ExecOutput {
                exit_code: 3,
                stdout: String::new(),
                stderr: "boom".to_string(),
            },
            0.2,
        );
        assert!(!bad.success);
        assert_eq!(bad.exit_code, Some(3));
    }

    #[test]
    fn timeout_result_reports_the_budget() {
        let result = SandboxResult::timed_out("r1", 30);
        assert!(!result.success);
        assert_eq!(result.execution_time, 30.0);
        assert!(result.error.unwrap().contains("timed out"));
    }
}
