//! Execution role reconciler
//!
//! Handles: IAM role, trust policy, `{role}-execution` policy

use super::{DeployContext, Reconciler};
use crate::error::DeployError;
use crate::reconcile_helpers::{self, Probe};
use cloud_client::{FunctionState, ManagedPolicy, PolicyDocument, Role};
use deploy_spec::DeploymentSpec;
use tracing::{debug, info};

/// Converged execution role
#[derive(Debug, Clone, PartialEq)]
pub struct RoleState {
    pub role_name: String,
    pub arn: String,
    /// Unique id; changes when the role is recreated
    pub role_id: String,
    pub trust_policy: PolicyDocument,
    pub execution_policy_arn: String,
    /// What reconciliation did to reach this state
    pub action: RoleActionKind,
}

/// Execution policy as found on the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPolicyCheck {
    pub policy: Option<ManagedPolicy>,
    pub attached: bool,
    pub document_current: bool,
}

impl ExecutionPolicyCheck {
    fn is_current(&self) -> bool {
        self.policy.is_some() && self.attached && self.document_current
    }
}

/// Decision taken once per role reconcile
#[derive(Debug, Clone, PartialEq)]
pub enum RoleAction {
    /// Role absent
    Create,
    /// Role present and already matching
    Reuse { role: Role, execution: ExecutionPolicyCheck },
    /// Role present with drifted trust or execution policy
    Update {
        role: Role,
        trust_drift: bool,
        execution: ExecutionPolicyCheck,
    },
    /// Role present and recreation was requested
    Recreate { role: Role },
}

/// Tag of a `RoleAction`, kept in the converged state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleActionKind {
    Create,
    Reuse,
    Update,
    Recreate,
}

impl RoleAction {
    pub fn kind(&self) -> RoleActionKind {
        match self {
            Self::Create => RoleActionKind::Create,
            Self::Reuse { .. } => RoleActionKind::Reuse,
            Self::Update { .. } => RoleActionKind::Update,
            Self::Recreate { .. } => RoleActionKind::Recreate,
        }
    }
}

impl Reconciler {
    /// Converges the execution role for `spec`.
    pub async fn reconcile_role(&self, spec: &DeploymentSpec, ctx: &mut DeployContext) -> Result<RoleState, DeployError> {
        let role_name = spec.role_name();
        info!("Reconciling execution role {}", role_name);

        let action = self.plan_role(&role_name, spec.force_recreate_role).await?;
        let kind = action.kind();
        debug!("Role {}: {:?}", role_name, kind);

        let (role, execution_policy_arn) = match action {
            RoleAction::Create => self.create_role(&role_name, &spec.function_name, ctx).await?,
            RoleAction::Reuse { role, execution } => {
                ctx.warn(format!("Role {} already up to date, no changes made", role_name));
                let arn = execution.policy.map(|p| p.arn).unwrap_or_default();
                (role, arn)
            }
            RoleAction::Update {
                role,
                trust_drift,
                execution,
            } => {
                let arn = self.update_role(&role, trust_drift, execution, ctx).await?;
                (role, arn)
            }
            RoleAction::Recreate { role } => {
                self.tear_down_role(&role, &spec.function_name, ctx).await?;
                self.create_role(&role_name, &spec.function_name, ctx).await?
            }
        };

        Ok(RoleState {
            role_name: role.role_name,
            arn: role.arn,
            role_id: role.role_id,
            trust_policy: role.assume_role_policy_document,
            execution_policy_arn,
            action: kind,
        })
    }

    /// Look the role up and decide what to do with it
    pub async fn plan_role(&self, role_name: &str, force_recreate: bool) -> Result<RoleAction, DeployError> {
        let Some(role) = self.client.get_role(role_name).await? else {
            return Ok(RoleAction::Create);
        };
        if force_recreate {
            return Ok(RoleAction::Recreate { role });
        }

        let trust_drift = !role
            .assume_role_policy_document
            .is_equivalent(&reconcile_helpers::lambda_trust_policy());
        let execution = self.check_execution_policy(role_name).await?;

        if !trust_drift && execution.is_current() {
            Ok(RoleAction::Reuse { role, execution })
        } else {
            Ok(RoleAction::Update {
                role,
                trust_drift,
                execution,
            })
        }
    }

    async fn check_execution_policy(&self, role_name: &str) -> Result<ExecutionPolicyCheck, DeployError> {
        let policy_name = reconcile_helpers::execution_policy_name(role_name);
        let policy = self.client.get_policy_by_name(&policy_name).await?;
        let Some(policy) = policy else {
            return Ok(ExecutionPolicyCheck {
                policy: None,
                attached: false,
                document_current: false,
            });
        };

        let attached = self
            .client
            .list_attached_role_policies(role_name)
            .await?
            .iter()
            .any(|p| p.policy_arn == policy.arn);
        let document_current = policy.document.is_equivalent(&reconcile_helpers::execution_policy());
        Ok(ExecutionPolicyCheck {
            policy: Some(policy),
            attached,
            document_current,
        })
    }

    async fn create_role(&self, role_name: &str, function_name: &str, ctx: &mut DeployContext) -> Result<(Role, String), DeployError> {
        let description = format!("Execution role for Lambda function {}", function_name);
        let role = self
            .client
            .create_role(role_name, &reconcile_helpers::lambda_trust_policy(), &description)
            .await?;
        ctx.record_mutation("Created role", &role.arn);

        // Deleting a role leaves its customer-managed policies behind
        let policy_name = reconcile_helpers::execution_policy_name(role_name);
        let policy = match self.client.get_policy_by_name(&policy_name).await? {
            Some(policy) if policy.document.is_equivalent(&reconcile_helpers::execution_policy()) => {
                debug!("Reusing existing execution policy {}", policy.arn);
                policy
            }
            existing => self.ensure_execution_policy(role_name, existing, ctx).await?,
        };
        self.attach_policy(role_name, &policy.arn, ctx).await?;
        self.wait_for_role(&role.arn).await?;
        Ok((role, policy.arn))
    }

    async fn update_role(
        &self,
        role: &Role,
        trust_drift: bool,
        execution: ExecutionPolicyCheck,
        ctx: &mut DeployContext,
    ) -> Result<String, DeployError> {
        if trust_drift {
            self.client
                .update_assume_role_policy(&role.role_name, &reconcile_helpers::lambda_trust_policy())
                .await?;
            ctx.record_mutation("Updated trust policy of role", &role.arn);
        } else {
            debug!("Trust policy of role {} already up to date", role.role_name);
        }

        let policy = match execution.policy {
            Some(policy) if execution.document_current => {
                debug!("Execution policy {} already up to date", policy.arn);
                policy
            }
            existing => self.ensure_execution_policy(&role.role_name, existing, ctx).await?,
        };
        if execution.attached {
            debug!("Execution policy {} already attached to {}", policy.arn, role.role_name);
        } else {
            self.attach_policy(&role.role_name, &policy.arn, ctx).await?;
        }
        Ok(policy.arn)
    }

    /// Create the execution policy, or bring an existing one's document up to date
    async fn ensure_execution_policy(
        &self,
        role_name: &str,
        existing: Option<ManagedPolicy>,
        ctx: &mut DeployContext,
    ) -> Result<ManagedPolicy, DeployError> {
        let document = reconcile_helpers::execution_policy();
        let policy = match existing {
            Some(policy) => {
                let updated = self.client.update_policy_document(&policy.arn, &document).await?;
                ctx.record_mutation("Updated execution policy", &updated.arn);
                updated
            }
            None => {
                let name = reconcile_helpers::execution_policy_name(role_name);
                let description = format!("Basic execution permissions for role {}", role_name);
                let created = self.client.create_policy(&name, &document, &description).await?;
                ctx.record_mutation("Created execution policy", &created.arn);
                created
            }
        };
        Ok(policy)
    }

    pub(crate) async fn attach_policy(&self, role_name: &str, policy_arn: &str, ctx: &mut DeployContext) -> Result<(), DeployError> {
        self.client.attach_role_policy(role_name, policy_arn).await?;
        ctx.record_mutation("Attached policy", &format!("{} to role {}", policy_arn, role_name));
        Ok(())
    }

    /// Detach and delete everything the deployer owns on `role`, then the role itself
    async fn tear_down_role(&self, role: &Role, function_name: &str, ctx: &mut DeployContext) -> Result<(), DeployError> {
        let users: Vec<String> = self
            .client
            .list_functions()
            .await?
            .into_iter()
            .filter(|f| f.role == role.arn && f.function_name != function_name)
            .filter(|f| matches!(f.state, FunctionState::Active | FunctionState::Pending))
            .map(|f| f.function_name)
            .collect();
        if let Some(user) = users.first() {
            return Err(DeployError::conflict(
                user.clone(),
                format!(
                    "role {} is used by active function(s) {}; refusing to recreate it",
                    role.role_name,
                    users.join(", ")
                ),
            ));
        }

        info!("Recreating role {} (previous id {})", role.role_name, role.role_id);

        for attached in self.client.list_attached_role_policies(&role.role_name).await? {
            self.client
                .detach_role_policy(&role.role_name, &attached.policy_arn)
                .await?;
            ctx.record_mutation(
                "Detached policy",
                &format!("{} from role {}", attached.policy_arn, role.role_name),
            );
        }

        let owned = [
            reconcile_helpers::execution_policy_name(&role.role_name),
            reconcile_helpers::access_policy_name(&role.role_name),
        ];
        for policy_name in owned {
            if let Some(policy) = self.client.get_policy_by_name(&policy_name).await? {
                self.client.delete_policy(&policy.arn).await?;
                ctx.record_mutation("Deleted policy", &policy.arn);
            }
        }

        self.client.delete_role(&role.role_name).await?;
        ctx.record_mutation("Deleted role", &role.arn);
        Ok(())
    }

    /// Wait until the compute service can assume a freshly created role
    async fn wait_for_role(&self, role_arn: &str) -> Result<(), DeployError> {
        let client = self.client.as_ref();
        let what = format!("role {} to become assumable", role_arn);
        reconcile_helpers::wait_until(&self.wait, self.cancel.as_ref(), &what, || async move {
            let assumable = client.role_is_assumable(role_arn).await?;
            Ok::<_, DeployError>(if assumable { Probe::Ready(()) } else { Probe::NotYet })
        })
        .await
    }
}
