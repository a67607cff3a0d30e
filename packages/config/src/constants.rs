// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Corral

// Root Configuration
pub const CORRAL_ROOT: &str = "CORRAL_ROOT";

// Queue Tree Roots
pub const CORRAL_TASKS_DIR: &str = "CORRAL_TASKS_DIR";
pub const CORRAL_TRIGGERS_DIR: &str = "CORRAL_TRIGGERS_DIR";
pub const CORRAL_RESULTS_DIR: &str = "CORRAL_RESULTS_DIR";
pub const CORRAL_HEARTBEATS_DIR: &str = "CORRAL_HEARTBEATS_DIR";
pub const CORRAL_ARCHIVE_DIR: &str = "CORRAL_ARCHIVE_DIR";

// Sandbox Spool Directories
pub const CORRAL_SANDBOX_REQUESTS_DIR: &str = "CORRAL_SANDBOX_REQUESTS_DIR";
pub const CORRAL_SANDBOX_RESULTS_DIR: &str = "CORRAL_SANDBOX_RESULTS_DIR";
pub const CORRAL_SANDBOX_SCRATCH_DIR: &str = "CORRAL_SANDBOX_SCRATCH_DIR";

// Sandbox Service Tuning
pub const CORRAL_SANDBOX_ALLOWED_IMAGES: &str = "CORRAL_SANDBOX_ALLOWED_IMAGES";
pub const CORRAL_SANDBOX_POLL_INTERVAL_MS: &str = "CORRAL_SANDBOX_POLL_INTERVAL_MS";
pub const CORRAL_SANDBOX_SETTLE_MS: &str = "CORRAL_SANDBOX_SETTLE_MS";
pub const CORRAL_SANDBOX_MAX_CONCURRENT: &str = "CORRAL_SANDBOX_MAX_CONCURRENT";
pub const CORRAL_SANDBOX_CLEANUP_INTERVAL_MINUTES: &str = "CORRAL_SANDBOX_CLEANUP_INTERVAL_MINUTES";

// Notification Bridge
pub const CORRAL_NOTIFY_COMMAND: &str = "CORRAL_NOTIFY_COMMAND";
pub const CORRAL_NOTIFY_TIMEOUT_SECS: &str = "CORRAL_NOTIFY_TIMEOUT_SECS";
