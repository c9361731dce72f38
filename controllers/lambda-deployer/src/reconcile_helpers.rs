//! Helper functions for common reconciliation patterns
//!
//! This module holds the bounded polling loop every propagation wait goes
//! through, cancellation checks, and the policy documents the reconcilers
//! converge roles towards.

use crate::backoff::ExponentialBackoff;
use crate::error::DeployError;
use cloud_client::{Effect, PolicyDocument, PolicyStatement};
use deploy_spec::{AccessGrant, BUCKET_ACCESS_SID, BUCKET_ACTIONS};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Service principal allowed to assume execution roles
pub const LAMBDA_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";

/// Actions of the basic execution (logging) policy
pub const EXECUTION_ACTIONS: [&str; 3] = ["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"];

const EXECUTION_RESOURCE: &str = "arn:aws:logs:*:*:*";

/// Bounds for every propagation wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPolicy {
    /// First delay between polls
    pub initial_delay: Duration,
    /// Cap for the delay between polls
    pub max_delay: Duration,
    /// Wall-clock limit for one wait
    pub deadline: Duration,
    /// Maximum number of polls for one wait
    pub max_attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            deadline: Duration::from_secs(300),
            max_attempts: 60,
        }
    }
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    Ready(T),
    NotYet,
}

/// Fail with `Cancelled` if cancellation has been requested
pub fn check_cancelled(cancel: Option<&watch::Receiver<bool>>, what: &str) -> Result<(), DeployError> {
    if cancel.is_some_and(|rx| *rx.borrow()) {
        return Err(DeployError::Cancelled(what.to_string()));
    }
    Ok(())
}

/// Sleep for `delay`, returning early with `Cancelled` if cancellation is requested
async fn sleep_or_cancel(delay: Duration, cancel: Option<&watch::Receiver<bool>>, what: &str) -> Result<(), DeployError> {
    let Some(rx) = cancel else {
        tokio::time::sleep(delay).await;
        return Ok(());
    };
    let mut rx = rx.clone();
    tokio::select! {
        _ = tokio::time::sleep(delay) => Ok(()),
        Ok(_) = rx.wait_for(|cancelled| *cancelled) => Err(DeployError::Cancelled(what.to_string())),
    }
}

/// Poll `probe` until it is ready, within the bounds of `policy`
///
/// `Unavailable` errors from the probe are retried like a not-ready answer
/// and turn into `Timeout` once the bound is hit. Any other error ends the
/// wait immediately.
pub async fn wait_until<T, F, Fut>(
    policy: &WaitPolicy,
    cancel: Option<&watch::Receiver<bool>>,
    what: &str,
    mut probe: F,
) -> Result<T, DeployError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>, DeployError>>,
{
    let started = Instant::now();
    let mut backoff = ExponentialBackoff::new(policy.initial_delay, policy.max_delay);
    let mut attempts = 0u32;

    loop {
        check_cancelled(cancel, what)?;
        attempts += 1;

        match probe().await {
            Ok(Probe::Ready(value)) => {
                debug!("{} ready after {} attempt(s)", what, attempts);
                return Ok(value);
            }
            Ok(Probe::NotYet) => debug!("{} not ready yet (attempt {})", what, attempts),
            Err(DeployError::Unavailable(reason)) => {
                warn!("Provider unavailable while waiting for {}: {}, will retry", what, reason);
            }
            Err(e) => return Err(e),
        }

        let elapsed = started.elapsed();
        if attempts >= policy.max_attempts || elapsed >= policy.deadline {
            return Err(DeployError::Timeout {
                what: what.to_string(),
                attempts,
                elapsed,
            });
        }

        let delay = backoff.next_backoff().min(policy.deadline - elapsed);
        sleep_or_cancel(delay, cancel, what).await?;
    }
}

/// Trust policy letting the Lambda service assume a role
pub fn lambda_trust_policy() -> PolicyDocument {
    PolicyDocument::new(vec![PolicyStatement {
        sid: None,
        effect: Effect::Allow,
        principal: Some(serde_json::json!({ "Service": LAMBDA_SERVICE_PRINCIPAL })),
        action: vec!["sts:AssumeRole".to_string()],
        resource: Vec::new(),
    }])
}

/// Basic execution policy: write CloudWatch logs
pub fn execution_policy() -> PolicyDocument {
    PolicyDocument::new(vec![PolicyStatement {
        sid: None,
        effect: Effect::Allow,
        principal: None,
        action: EXECUTION_ACTIONS.iter().map(|a| a.to_string()).collect(),
        resource: vec![EXECUTION_RESOURCE.to_string()],
    }])
}

pub fn execution_policy_name(role_name: &str) -> String {
    format!("{}-execution", role_name)
}

pub fn access_policy_name(role_name: &str) -> String {
    format!("{}-s3-access", role_name)
}

/// Statement granting the deployer's action set on exactly one bucket
pub fn bucket_statement(bucket: &str) -> PolicyStatement {
    PolicyStatement {
        sid: Some(BUCKET_ACCESS_SID.to_string()),
        effect: Effect::Allow,
        principal: None,
        action: BUCKET_ACTIONS.iter().map(|a| a.to_string()).collect(),
        resource: AccessGrant::bucket_resources(bucket),
    }
}

/// Desired access policy: `existing` with the deployer-owned statement replaced
///
/// Statements without the deployer's Sid are kept untouched.
pub fn merge_bucket_statement(existing: Option<&PolicyDocument>, bucket: &str) -> PolicyDocument {
    let mut statement: Vec<PolicyStatement> = existing
        .map(|doc| {
            doc.statement
                .iter()
                .filter(|s| s.sid.as_deref() != Some(BUCKET_ACCESS_SID))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    statement.push(bucket_statement(bucket));

    let mut document = PolicyDocument::new(statement);
    if let Some(existing) = existing {
        document.version = existing.version.clone();
    }
    document
}

#[cfg(test)]
#[path = "reconcile_helpers_test.rs"]
mod reconcile_helpers_test;
