//! Lambda Deployer
//!
//! Converges a container-image Lambda deployment against a cloud account:
//! - Execution role with a Lambda trust policy and a logging policy
//! - Bucket-access policy scoped to exactly one bucket
//! - The function itself (code, memory, timeout, environment)
//! - Optional VPC placement
//!
//! Every step is idempotent; re-running a converged deployment makes no
//! mutating provider call.

pub mod backoff;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod output;
pub mod reconcile_helpers;
pub mod reconciler;
#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{Config, ConfigError};
pub use discovery::NetworkInventory;
pub use error::{DeployError, DeploymentFailure, DeploymentOutcome, ErrorKind};
pub use reconcile_helpers::WaitPolicy;
pub use reconciler::{DeployContext, Reconciler, RoleAction, RoleState};
