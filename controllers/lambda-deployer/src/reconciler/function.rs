//! Compute function convergence
//!
//! Handles: Lambda function code, configuration and lifecycle waits

use super::{DeployContext, Reconciler, RoleState};
use crate::error::DeployError;
use crate::reconcile_helpers::{self, Probe};
use cloud_client::{
    CloudClientTrait, CreateFunctionRequest, FunctionConfiguration, FunctionState, LastUpdateStatus,
    UpdateFunctionConfigurationRequest,
};
use deploy_spec::{DeploymentSpec, LifecycleState};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Environment variable carrying the bucket name into the function
pub const BUCKET_ENV_VAR: &str = "S3_BUCKET";

/// Lifecycle state as reported in the deployment result
pub fn lifecycle_of(function: &FunctionConfiguration) -> LifecycleState {
    // A failed update leaves the previous configuration running
    match (function.state, function.last_update_status) {
        (FunctionState::Failed, _) => LifecycleState::Failed,
        (FunctionState::Pending, _) => LifecycleState::Creating,
        (_, Some(LastUpdateStatus::InProgress)) => LifecycleState::Updating,
        (FunctionState::Active | FunctionState::Inactive, _) => LifecycleState::Active,
    }
}

/// One poll of a function's lifecycle
async fn poll_function(client: &dyn CloudClientTrait, function_name: &str) -> Result<Probe<FunctionConfiguration>, DeployError> {
    let function = client
        .get_function(function_name)
        .await?
        .ok_or_else(|| DeployError::ResourceNotFound(format!("function {}", function_name)))?;

    if function.state == FunctionState::Failed {
        let reason = function
            .state_reason
            .unwrap_or_else(|| "function entered failed state".to_string());
        return Err(DeployError::conflict(function.function_arn, reason));
    }
    if function.last_update_status == Some(LastUpdateStatus::Failed) {
        let reason = function
            .last_update_status_reason
            .unwrap_or_else(|| "function update failed".to_string());
        return Err(DeployError::conflict(function.function_arn, reason));
    }
    if function.is_transitioning() {
        return Ok(Probe::NotYet);
    }
    Ok(Probe::Ready(function))
}

/// Existing environment with the deployer's variables merged in
fn desired_environment(current: &BTreeMap<String, String>, bucket: &str) -> BTreeMap<String, String> {
    let mut environment = current.clone();
    environment.insert(BUCKET_ENV_VAR.to_string(), bucket.to_string());
    environment
}

/// Configuration changes needed to match `spec`; empty when in sync
fn configuration_drift(function: &FunctionConfiguration, spec: &DeploymentSpec, role: &RoleState) -> UpdateFunctionConfigurationRequest {
    let environment = desired_environment(&function.environment, &spec.bucket);
    UpdateFunctionConfigurationRequest {
        role: (function.role != role.arn).then(|| role.arn.clone()),
        memory_size: (function.memory_size != spec.memory_size).then_some(spec.memory_size),
        timeout: (function.timeout != spec.timeout).then_some(spec.timeout),
        environment: (function.environment != environment).then_some(environment),
        vpc_config: None,
    }
}

impl Reconciler {
    /// Creates or updates the function so it matches `spec`, then waits for it to settle.
    pub async fn converge_function(
        &self,
        spec: &DeploymentSpec,
        role: &RoleState,
        ctx: &mut DeployContext,
    ) -> Result<FunctionConfiguration, DeployError> {
        let name = spec.function_name.as_str();
        info!("Converging function {}", name);

        let existing = match self.client.get_function(name).await? {
            Some(function) if function.is_transitioning() => {
                info!("Function {} is still {}, waiting before changing it", name, lifecycle_of(&function));
                ctx.result.state = lifecycle_of(&function);
                Some(self.settle(name, ctx).await?)
            }
            other => other,
        };

        let Some(mut function) = existing else {
            let request = CreateFunctionRequest {
                function_name: name.to_string(),
                role: role.arn.clone(),
                image_uri: spec.image_uri.clone(),
                memory_size: spec.memory_size,
                timeout: spec.timeout,
                environment: desired_environment(&BTreeMap::new(), &spec.bucket),
                vpc_config: None,
            };
            let created = self.client.create_function(&request).await?;
            ctx.record_mutation("Created function", &created.function_arn);
            ctx.result.function_arn = Some(created.function_arn.clone());
            ctx.result.state = LifecycleState::Creating;
            return self.settle(name, ctx).await;
        };
        ctx.result.function_arn = Some(function.function_arn.clone());

        if function.state == FunctionState::Inactive {
            ctx.warn(format!("Function {} is inactive; it reactivates on its next invocation", name));
        }

        let mut changed = false;
        if function.image_uri != spec.image_uri {
            self.client.update_function_code(name, &spec.image_uri).await?;
            ctx.record_mutation(
                "Updated function code",
                &format!("{} to {}", function.function_arn, spec.image_uri),
            );
            ctx.result.state = LifecycleState::Updating;
            function = self.settle(name, ctx).await?;
            changed = true;
        }

        let drift = configuration_drift(&function, spec, role);
        if !drift.is_empty() {
            self.client.update_function_configuration(name, &drift).await?;
            ctx.record_mutation("Updated function configuration", &function.function_arn);
            ctx.result.state = LifecycleState::Updating;
            function = self.settle(name, ctx).await?;
            changed = true;
        }

        if !changed {
            debug!("Function {} already up to date", name);
            if function.state == FunctionState::Failed {
                ctx.result.state = LifecycleState::Failed;
                let reason = function
                    .state_reason
                    .clone()
                    .unwrap_or_else(|| "function is in failed state".to_string());
                return Err(DeployError::conflict(function.function_arn.clone(), reason));
            }
        }

        ctx.result.state = lifecycle_of(&function);
        Ok(function)
    }

    /// Wait for the function to settle and record its lifecycle in the result
    pub(crate) async fn settle(&self, function_name: &str, ctx: &mut DeployContext) -> Result<FunctionConfiguration, DeployError> {
        match self.wait_for_function(function_name).await {
            Ok(function) => {
                ctx.result.state = lifecycle_of(&function);
                Ok(function)
            }
            Err(e) => {
                if matches!(e, DeployError::Conflict { .. }) {
                    ctx.result.state = LifecycleState::Failed;
                }
                Err(e)
            }
        }
    }

    /// Poll until the function is active with no update in progress
    ///
    /// A failed creation or update ends the wait with `Conflict` carrying the
    /// provider's reason.
    pub async fn wait_for_function(&self, function_name: &str) -> Result<FunctionConfiguration, DeployError> {
        let client = self.client.as_ref();
        let what = format!("function {} to settle", function_name);
        reconcile_helpers::wait_until(&self.wait, self.cancel.as_ref(), &what, || {
            poll_function(client, function_name)
        })
        .await
    }
}
