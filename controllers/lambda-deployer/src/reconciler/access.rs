//! Bucket access binder
//!
//! Handles: `{role}-s3-access` policy, live access probe

use super::{DeployContext, Reconciler, RoleState};
use crate::error::DeployError;
use crate::reconcile_helpers;
use cloud_client::CloudError;
use deploy_spec::AccessGrant;
use tracing::{debug, info};

/// Operation name the deployed function answers the access probe on
pub const PROBE_OPERATION: &str = "test_s3_access";

impl Reconciler {
    /// Ensures the role's access policy grants exactly `bucket`.
    ///
    /// The deployer owns one statement (by Sid) inside the policy; other
    /// statements in the same policy are preserved.
    pub async fn bind_bucket_access(&self, role: &RoleState, bucket: &str, ctx: &mut DeployContext) -> Result<AccessGrant, DeployError> {
        info!("Binding bucket {} to role {}", bucket, role.role_name);

        self.client.head_bucket(bucket).await.map_err(|e| match e {
            CloudError::NotFound(_) => DeployError::ResourceNotFound(format!("bucket {}", bucket)),
            CloudError::PermissionDenied(msg) => {
                DeployError::PermissionDenied(format!("bucket {}: {}", bucket, msg))
            }
            other => other.into(),
        })?;

        let policy_name = reconcile_helpers::access_policy_name(&role.role_name);
        let existing = self.client.get_policy_by_name(&policy_name).await?;
        let desired = reconcile_helpers::merge_bucket_statement(existing.as_ref().map(|p| &p.document), bucket);

        let policy_arn = match existing {
            None => {
                let description = format!("Bucket access for role {}", role.role_name);
                let created = self.client.create_policy(&policy_name, &desired, &description).await?;
                ctx.record_mutation("Created access policy", &created.arn);
                self.attach_policy(&role.role_name, &created.arn, ctx).await?;
                created.arn
            }
            Some(policy) => {
                let mut changed = false;
                if policy.document.is_equivalent(&desired) {
                    debug!("Access policy {} already grants {}", policy.arn, bucket);
                } else {
                    self.client.update_policy_document(&policy.arn, &desired).await?;
                    ctx.record_mutation("Updated access policy", &policy.arn);
                    changed = true;
                }

                let attached = self
                    .client
                    .list_attached_role_policies(&role.role_name)
                    .await?
                    .iter()
                    .any(|p| p.policy_arn == policy.arn);
                if !attached {
                    self.attach_policy(&role.role_name, &policy.arn, ctx).await?;
                    changed = true;
                }

                if !changed {
                    ctx.warn(format!(
                        "Access to bucket {} already granted to role {}, no changes made",
                        bucket, role.role_name
                    ));
                }
                policy.arn
            }
        };

        Ok(AccessGrant::for_bucket(bucket, policy_arn))
    }

    /// Invokes the function to check it can reach `bucket`; never fatal
    pub async fn probe_bucket_access(&self, function_name: &str, bucket: &str, ctx: &mut DeployContext) {
        let payload = serde_json::json!({
            "operation": PROBE_OPERATION,
            "s3_bucket": bucket,
        });
        info!("Probing bucket access of {} to {}", function_name, bucket);

        match self.client.invoke_function(function_name, &payload).await {
            Ok(response) if response.status_code == 200 && response.function_error.is_none() => {
                info!("Function {} reached bucket {}", function_name, bucket);
            }
            Ok(response) => ctx.warn(format!(
                "Access probe of {} to bucket {} failed: status {}{}",
                function_name,
                bucket,
                response.status_code,
                response
                    .function_error
                    .map(|e| format!(", function error {}", e))
                    .unwrap_or_default()
            )),
            Err(e) => ctx.warn(format!(
                "Access probe of {} to bucket {} could not run: {}",
                function_name, bucket, e
            )),
        }
    }
}
