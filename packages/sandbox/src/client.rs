// ABOUTME: Submission client for the sandbox service
// ABOUTME: Atomic request drop-off plus a timeout-bound wait for the result

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use corral_config::{constants, dir_or_default};
use corral_queue::storage;

use crate::error::Result;
use crate::types::{SandboxRequest, SandboxResult};

/// Extra slack on top of the execution budget before a wait gives up
const DEFAULT_WAIT_OVERHEAD: Duration = Duration::from_secs(5);

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Outcome of waiting for a sandbox result
///
/// `Unknown` is not a failure: the request may still execute, the submitter
/// just cannot tell from here and must reconcile out of band.
#[derive(Debug)]
pub enum WaitOutcome {
    Completed(SandboxResult),
    Unknown,
}

/// Client side of the sandbox spool
#[derive(Debug, Clone)]
pub struct SandboxClient {
    requests_dir: PathBuf,
    results_dir: PathBuf,
    poll_interval: Duration,
    wait_overhead: Duration,
}

impl SandboxClient {
    pub fn new(requests_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            requests_dir: requests_dir.into(),
            results_dir: results_dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_overhead: DEFAULT_WAIT_OVERHEAD,
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            dir_or_default(constants::CORRAL_SANDBOX_REQUESTS_DIR, "sandbox-requests"),
            dir_or_default(constants::CORRAL_SANDBOX_RESULTS_DIR, "sandbox-results"),
        )
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_wait_overhead(mut self, overhead: Duration) -> Self {
        self.wait_overhead = overhead;
        self
    }

    /// Drop a request into the spool; returns its id
    pub fn submit(&self, request: &SandboxRequest) -> Result<String> {
        let path = self
            .requests_dir
            .join(format!("{}.json", request.request_id));
        storage::write_json_atomic(&path, request)?;
        debug!("Submitted sandbox request {}", request.request_id);
        Ok(request.request_id.clone())
    }

    /// Take the result if it has been written, deleting the spool copy
    pub fn try_take_result(&self, request_id: &str) -> Result<Option<SandboxResult>> {
        let path = self.results_dir.join(format!("{}.json", request_id));
        if !path.is_file() {
            return Ok(None);
        }
        let result: SandboxResult = storage::read_json(&path)?;
        fs::remove_file(&path)?;
        Ok(Some(result))
    }

    /// Poll for the result, bounded by the execution budget plus a fixed
    /// overhead
    ///
    /// Expiry yields [`WaitOutcome::Unknown`], a distinct state from any
    /// failed execution.
    pub async fn wait_for_result(
        &self,
        request_id: &str,
        execution_timeout: Duration,
    ) -> Result<WaitOutcome> {
        let budget = execution_timeout + self.wait_overhead;

        let poll = async {
            loop {
                if let Some(result) = self.try_take_result(request_id)? {
                    return Ok(WaitOutcome::Completed(result));
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(budget, poll).await {
            Ok(outcome) => outcome,
            Err(_) => Ok(WaitOutcome::Unknown),
        }
    }
}
