//! Deployer error types.
//!
//! `DeployError` is the normalized taxonomy every reconciliation step fails
//! with. `DeploymentFailure` wraps the first fatal error together with the
//! phase it happened in and whatever had converged up to that point.

use cloud_client::CloudError;
use deploy_spec::{DeploymentResult, Phase, SpecError};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Error taxonomy for a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    ResourceNotFound,
    Conflict,
    Unavailable,
    Timeout,
    Cancelled,
    InvalidSpec,
}

/// Errors that can occur while reconciling a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Spec rejected before any provider call
    #[error("Invalid spec: {0}")]
    InvalidSpec(#[from] SpecError),

    /// Provider refused the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Referenced resource does not exist
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// An existing resource blocks the operation
    #[error("Conflict on {resource}: {message}")]
    Conflict { resource: String, message: String },

    /// Transient provider failure outside a wait loop
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// A bounded wait ran out of attempts or time
    #[error("Timed out waiting for {what} after {attempts} attempts ({elapsed:?})")]
    Timeout {
        what: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// Cancellation was requested
    #[error("Cancelled while waiting for {0}")]
    Cancelled(String),
}

impl DeployError {
    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSpec(_) => ErrorKind::InvalidSpec,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::ResourceNotFound(_) => ErrorKind::ResourceNotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled(_) => ErrorKind::Cancelled,
        }
    }
}

impl From<CloudError> for DeployError {
    fn from(error: CloudError) -> Self {
        match error {
            CloudError::PermissionDenied(msg) => Self::PermissionDenied(msg),
            CloudError::NotFound(msg) => Self::ResourceNotFound(msg),
            CloudError::Conflict { resource, message } => Self::Conflict { resource, message },
            // The provider rejected the request as sent; nothing to retry
            CloudError::InvalidRequest(msg) => Self::conflict("request", msg),
            CloudError::Unavailable(msg) => Self::Unavailable(msg),
            CloudError::Http(e) => Self::Unavailable(e.to_string()),
            CloudError::Serialization(e) => Self::Unavailable(format!("unreadable provider response: {}", e)),
            CloudError::Api(msg) => Self::Unavailable(msg),
        }
    }
}

/// Fatal deployment failure with the partial result
#[derive(Debug, Error)]
#[error("deployment failed in {phase} phase: {error}")]
pub struct DeploymentFailure {
    pub phase: Phase,
    #[source]
    pub error: DeployError,
    /// What had converged before the failure
    pub result: Box<DeploymentResult>,
    /// True iff a mutating provider call succeeded during this invocation
    pub partially_converged: bool,
}

impl DeploymentFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Final outcome of one `deploy` invocation
#[derive(Debug)]
pub enum DeploymentOutcome {
    Done(DeploymentResult),
    Failed(DeploymentFailure),
}

impl DeploymentOutcome {
    /// Process exit code: done 0, failed 1, timeout 2, cancelled 3
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Done(_) => 0,
            Self::Failed(failure) => match failure.kind() {
                ErrorKind::Timeout => 2,
                ErrorKind::Cancelled => 3,
                _ => 1,
            },
        }
    }

    /// Outcome label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Done(_) => "done",
            Self::Failed(failure) => match failure.kind() {
                ErrorKind::Timeout => "timeout",
                ErrorKind::Cancelled => "cancelled",
                _ => "failed",
            },
        }
    }
}

impl From<Result<DeploymentResult, DeploymentFailure>> for DeploymentOutcome {
    fn from(result: Result<DeploymentResult, DeploymentFailure>) -> Self {
        match result {
            Ok(result) => Self::Done(result),
            Err(failure) => Self::Failed(failure),
        }
    }
}
