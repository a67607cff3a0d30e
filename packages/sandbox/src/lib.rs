// ABOUTME: Isolated command execution over a filesystem spool
// ABOUTME: Request validation, containerized execution, and result delivery

pub mod client;
pub mod error;
pub mod runner;
pub mod scratch;
pub mod service;
pub mod types;
pub mod validate;

pub use client::{SandboxClient, WaitOutcome};
pub use error::{Result, SandboxError};
pub use runner::{ContainerRunner, ContainerSpec, DockerRunner, MAX_CAPTURE_BYTES};
pub use scratch::ScratchDir;
pub use service::{SandboxService, ServiceConfig, DEFAULT_ALLOWED_IMAGES};
pub use types::{ExecOutput, ResourceLimits, SandboxRequest, SandboxResult};
pub use validate::validate_request;
