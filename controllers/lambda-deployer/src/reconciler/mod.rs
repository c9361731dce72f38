//! Reconciliation logic for a Lambda deployment.
//!
//! This module is organized by the resource each step converges:
//! - `role`: execution role, trust policy and execution policy
//! - `access`: bucket-access policy and the optional live probe
//! - `function`: the compute function itself
//! - `network`: VPC placement of the function
//!
//! `Reconciler::deploy` runs them in dependency order and tracks the stage
//! reached, so a failure can report its phase and partial result.

pub mod access;
pub mod function;
pub mod network;
pub mod role;

#[cfg(test)]
mod function_test;

pub use role::{RoleAction, RoleActionKind, RoleState};

use crate::error::{DeployError, DeploymentFailure};
use crate::reconcile_helpers::{self, WaitPolicy};
use cloud_client::CloudClientTrait;
use deploy_spec::{DeploymentResult, DeploymentSpec, NetworkAttachment, Phase, Stage};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Per-invocation bookkeeping shared by the reconcile steps
#[derive(Debug)]
pub struct DeployContext {
    /// Result as converged so far
    pub result: DeploymentResult,
    /// Set once any mutating provider call succeeds
    pub mutated: bool,
}

impl DeployContext {
    pub fn new(spec: &DeploymentSpec) -> Self {
        Self {
            result: DeploymentResult::new(spec.function_name.clone(), spec.role_name()),
            mutated: false,
        }
    }

    /// Record a successful mutating call
    pub(crate) fn record_mutation(&mut self, operation: &str, target: &str) {
        info!("{} {}", operation, target);
        self.mutated = true;
    }

    /// Record a non-fatal anomaly
    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.result.warnings.push(message);
    }

    fn into_failure(self, phase: Phase, error: DeployError) -> DeploymentFailure {
        error!("Deployment of {} failed in {} phase: {}", self.result.function_name, phase, error);
        DeploymentFailure {
            phase,
            error,
            partially_converged: self.mutated,
            result: Box::new(self.result),
        }
    }
}

/// Converges a `DeploymentSpec` against a cloud account.
pub struct Reconciler {
    pub(crate) client: Box<dyn CloudClientTrait>,
    pub(crate) wait: WaitPolicy,
    pub(crate) cancel: Option<watch::Receiver<bool>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("region", &self.client.region())
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(client: Box<dyn CloudClientTrait>) -> Self {
        Self {
            client,
            wait: WaitPolicy::default(),
            cancel: None,
        }
    }

    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Abort waits once `cancel` turns true
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn check_cancelled(&self, what: &str) -> Result<(), DeployError> {
        reconcile_helpers::check_cancelled(self.cancel.as_ref(), what)
    }

    /// Deploy `spec`, converging role, bucket access, function and network.
    ///
    /// `spec` is validated before any provider call. On a fatal error the
    /// failure carries the phase, the partial result, and whether anything
    /// was changed before the error.
    pub async fn deploy(&self, spec: &DeploymentSpec) -> Result<DeploymentResult, DeploymentFailure> {
        let mut ctx = DeployContext::new(spec);

        if let Err(e) = spec.validate() {
            return Err(ctx.into_failure(Phase::Validation, e.into()));
        }

        info!(
            "Deploying {} from {} (role {}, bucket {})",
            spec.function_name,
            spec.image_uri,
            ctx.result.role_name,
            spec.bucket
        );

        match self.run(spec, &mut ctx).await {
            Ok(()) => {
                ctx.result.advance(Stage::Done);
                info!(
                    "Deployment of {} done ({} warning(s))",
                    spec.function_name,
                    ctx.result.warnings.len()
                );
                Ok(ctx.result)
            }
            Err(e) => {
                let phase = ctx.result.stage.next_phase();
                Err(ctx.into_failure(phase, e))
            }
        }
    }

    async fn run(&self, spec: &DeploymentSpec, ctx: &mut DeployContext) -> Result<(), DeployError> {
        let network = spec.network()?;

        self.check_cancelled("role reconciliation")?;
        let role = self.reconcile_role(spec, ctx).await?;
        ctx.result.role_arn = Some(role.arn.clone());
        ctx.result.role_id = Some(role.role_id.clone());
        ctx.result.advance(Stage::RoleReconciled);

        self.check_cancelled("bucket access")?;
        let grant = self.bind_bucket_access(&role, &spec.bucket, ctx).await?;
        ctx.result.access_grant = Some(grant);
        ctx.result.advance(Stage::AccessBound);

        self.check_cancelled("function convergence")?;
        let function = self.converge_function(spec, &role, ctx).await?;
        ctx.result.function_arn = Some(function.function_arn.clone());
        ctx.result.advance(Stage::FunctionConverged);

        match network {
            Some(network) => {
                self.check_cancelled("network placement")?;
                let attachment = self.bind_network(&function, &network, ctx).await?;
                ctx.result.network = Some(attachment);
                ctx.result.advance(Stage::NetworkBound);
            }
            None => {
                if let Some(vpc) = function.attached_vpc() {
                    ctx.warn(format!(
                        "Function {} is attached to VPC {} but no network placement was requested; leaving it attached",
                        function.function_name,
                        vpc.vpc_id.as_deref().unwrap_or("(unknown)")
                    ));
                    ctx.result.network = Some(NetworkAttachment {
                        vpc_id: vpc.vpc_id.clone().unwrap_or_default(),
                        subnet_ids: vpc.subnet_ids.clone(),
                        security_group_ids: vpc.security_group_ids.clone(),
                    });
                } else {
                    debug!("No network placement requested for {}", function.function_name);
                }
            }
        }

        if spec.probe_access {
            self.probe_bucket_access(&function.function_name, &spec.bucket, ctx).await;
        }

        Ok(())
    }
}
