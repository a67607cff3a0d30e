// ABOUTME: Best-effort out-of-band wake-up of sleeping workers
// ABOUTME: Pluggable notifier trait with log-only and external-command backends

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use corral_config::{constants, u64_or_default};

/// Default bound on a single notification attempt
const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 5;

/// Outcome of a notification attempt
///
/// Never treated as a task-creation failure: the trigger file is the source
/// of truth and workers must poll or watch it independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Ok,
    Timeout,
    Error,
}

/// Wake-up signal delivery, distinct from the durable trigger file
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, worker: &str, message: &str) -> NotifyOutcome;
}

/// Default notifier: records the intent and delivers nothing
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, worker: &str, message: &str) -> NotifyOutcome {
        debug!("Notify (log-only) worker {}: {}", worker, message);
        NotifyOutcome::Ok
    }
}

/// Notifier that invokes an external program as `<program> <worker> <message>`
///
/// The child is killed when the bound expires; a non-zero exit is an error
/// outcome. All failures are logged as warnings and never escalate.
pub struct CommandNotifier {
    program: String,
    timeout: Duration,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Build from `CORRAL_NOTIFY_COMMAND`, if configured
    pub fn from_env() -> Option<Self> {
        let program = std::env::var(constants::CORRAL_NOTIFY_COMMAND).ok()?;
        let timeout = u64_or_default(
            constants::CORRAL_NOTIFY_TIMEOUT_SECS,
            DEFAULT_NOTIFY_TIMEOUT_SECS,
        );
        Some(Self::new(program, Duration::from_secs(timeout)))
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, worker: &str, message: &str) -> NotifyOutcome {
        let mut child = match Command::new(&self.program)
            .arg(worker)
            .arg(message)
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("Notify spawn failed for worker {}: {}", worker, e);
                return NotifyOutcome::Error;
            }
        };

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => NotifyOutcome::Ok,
            Ok(Ok(status)) => {
                warn!("Notify command exited {} for worker {}", status, worker);
                NotifyOutcome::Error
            }
            Ok(Err(e)) => {
                warn!("Notify wait failed for worker {}: {}", worker, e);
                NotifyOutcome::Error
            }
            Err(_) => {
                warn!(
                    "Notify timed out after {:?} for worker {}",
                    self.timeout, worker
                );
                let _ = child.start_kill();
                NotifyOutcome::Timeout
            }
        }
    }
}

/// Notifier selected by the environment: external command when configured,
/// log-only otherwise
pub fn notifier_from_env() -> Box<dyn Notifier> {
    match CommandNotifier::from_env() {
        Some(notifier) => Box::new(notifier),
        None => Box::new(LogNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert_eq!(LogNotifier.notify("w1", "wake").await, NotifyOutcome::Ok);
    }

    #[tokio::test]
    async fn missing_program_is_an_error_outcome() {
        let notifier = CommandNotifier::new(
            "corral-test-no-such-binary",
            Duration::from_secs(1),
        );
        assert_eq!(notifier.notify("w1", "wake").await, NotifyOutcome::Error);
    }

    #[tokio::test]
    async fn slow_program_times_out() {
        let notifier = CommandNotifier::new("sleep", Duration::from_millis(100));
        // both args are durations, so `sleep 5 0` blocks well past the bound
        let outcome = notifier.notify("5", "0").await;
        assert_eq!(outcome, NotifyOutcome::Timeout);
    }

    #[tokio::test]
    async fn failing_program_is_an_error_outcome() {
        let notifier = CommandNotifier::new("false", Duration::from_secs(1));
        assert_eq!(notifier.notify("w1", "wake").await, NotifyOutcome::Error);
    }
}
