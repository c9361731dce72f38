//! IAM operations for MockCloudClient
//!
//! Handles roles, managed policies, attachments and role propagation

use super::{lock, MockCloudClient};
use crate::error::CloudError;
use crate::models::*;
use chrono::Utc;

pub async fn get_role(client: &MockCloudClient, role_name: &str) -> Result<Option<Role>, CloudError> {
    client.record("get_role", role_name)?;
    Ok(lock(&client.roles).get(role_name).cloned())
}

pub async fn create_role(client: &MockCloudClient, role_name: &str, trust_policy: &PolicyDocument, description: &str) -> Result<Role, CloudError> {
    client.record("create_role", role_name)?;

    let mut roles = lock(&client.roles);
    if roles.contains_key(role_name) {
        return Err(CloudError::conflict(
            client.helpers.role_arn(role_name),
            "EntityAlreadyExists: role already exists",
        ));
    }

    let role = Role {
        role_name: role_name.to_string(),
        role_id: client.helpers.role_id(client.next_id()),
        arn: client.helpers.role_arn(role_name),
        assume_role_policy_document: trust_policy.clone(),
        description: Some(description.to_string()),
        create_date: Utc::now(),
    };
    roles.insert(role_name.to_string(), role.clone());
    lock(&client.role_attachments).insert(role_name.to_string(), Vec::new());
    lock(&client.role_propagation).insert(role.arn.clone(), client.settings().role_propagation_polls);
    Ok(role)
}

pub async fn update_assume_role_policy(client: &MockCloudClient, role_name: &str, trust_policy: &PolicyDocument) -> Result<(), CloudError> {
    client.record("update_assume_role_policy", role_name)?;
    let mut roles = lock(&client.roles);
    let role = roles
        .get_mut(role_name)
        .ok_or_else(|| CloudError::NotFound(format!("Role {} not found", role_name)))?;
    role.assume_role_policy_document = trust_policy.clone();
    Ok(())
}

pub async fn delete_role(client: &MockCloudClient, role_name: &str) -> Result<(), CloudError> {
    client.record("delete_role", role_name)?;

    if !lock(&client.roles).contains_key(role_name) {
        return Err(CloudError::NotFound(format!("Role {} not found", role_name)));
    }
    let attached = lock(&client.role_attachments)
        .get(role_name)
        .map(|policies| policies.len())
        .unwrap_or(0);
    if attached > 0 {
        return Err(CloudError::conflict(
            client.helpers.role_arn(role_name),
            "DeleteConflict: Cannot delete entity, must detach all policies first.",
        ));
    }

    if let Some(role) = lock(&client.roles).remove(role_name) {
        lock(&client.role_propagation).remove(&role.arn);
    }
    lock(&client.role_attachments).remove(role_name);
    Ok(())
}

pub async fn role_is_assumable(client: &MockCloudClient, role_arn: &str) -> Result<bool, CloudError> {
    client.record("role_is_assumable", role_arn)?;

    let exists = lock(&client.roles).values().any(|r| r.arn == role_arn);
    if !exists {
        return Ok(false);
    }
    let mut propagation = lock(&client.role_propagation);
    match propagation.get_mut(role_arn) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            Ok(false)
        }
        _ => Ok(true),
    }
}

pub async fn list_attached_role_policies(client: &MockCloudClient, role_name: &str) -> Result<Vec<AttachedPolicy>, CloudError> {
    client.record("list_attached_role_policies", role_name)?;
    if !lock(&client.roles).contains_key(role_name) {
        return Err(CloudError::NotFound(format!("Role {} not found", role_name)));
    }
    Ok(client.attached_policies(role_name))
}

pub async fn get_policy_by_name(client: &MockCloudClient, policy_name: &str) -> Result<Option<ManagedPolicy>, CloudError> {
    client.record("get_policy_by_name", policy_name)?;
    Ok(client.policy_by_name(policy_name))
}

pub async fn create_policy(client: &MockCloudClient, policy_name: &str, document: &PolicyDocument, _description: &str) -> Result<ManagedPolicy, CloudError> {
    client.record("create_policy", policy_name)?;

    let arn = client.helpers.policy_arn(policy_name);
    let mut policies = lock(&client.policies);
    if policies.contains_key(&arn) {
        return Err(CloudError::conflict(arn, "EntityAlreadyExists: policy already exists"));
    }

    let policy = ManagedPolicy {
        policy_name: policy_name.to_string(),
        arn: arn.clone(),
        default_version_id: "v1".to_string(),
        document: document.clone(),
        attachment_count: 0,
    };
    policies.insert(arn, policy.clone());
    Ok(policy)
}

pub async fn update_policy_document(client: &MockCloudClient, policy_arn: &str, document: &PolicyDocument) -> Result<ManagedPolicy, CloudError> {
    client.record("update_policy_document", policy_arn)?;

    let mut policies = lock(&client.policies);
    let policy = policies
        .get_mut(policy_arn)
        .ok_or_else(|| CloudError::NotFound(format!("Policy {} not found", policy_arn)))?;
    let version: u32 = policy
        .default_version_id
        .trim_start_matches('v')
        .parse()
        .unwrap_or(1);
    policy.default_version_id = format!("v{}", version + 1);
    policy.document = document.clone();
    Ok(policy.clone())
}

pub async fn delete_policy(client: &MockCloudClient, policy_arn: &str) -> Result<(), CloudError> {
    client.record("delete_policy", policy_arn)?;

    let mut policies = lock(&client.policies);
    let policy = policies
        .get(policy_arn)
        .ok_or_else(|| CloudError::NotFound(format!("Policy {} not found", policy_arn)))?;
    if policy.attachment_count > 0 {
        return Err(CloudError::conflict(
            policy_arn,
            "DeleteConflict: Cannot delete a policy attached to entities.",
        ));
    }
    policies.remove(policy_arn);
    Ok(())
}

pub async fn attach_role_policy(client: &MockCloudClient, role_name: &str, policy_arn: &str) -> Result<(), CloudError> {
    client.record("attach_role_policy", &format!("{} {}", role_name, policy_arn))?;

    if !lock(&client.roles).contains_key(role_name) {
        return Err(CloudError::NotFound(format!("Role {} not found", role_name)));
    }
    let mut policies = lock(&client.policies);
    let policy = policies
        .get_mut(policy_arn)
        .ok_or_else(|| CloudError::NotFound(format!("Policy {} not found", policy_arn)))?;

    let mut attachments = lock(&client.role_attachments);
    let attached = attachments.entry(role_name.to_string()).or_default();
    if !attached.iter().any(|p| p.policy_arn == policy_arn) {
        attached.push(AttachedPolicy {
            policy_name: policy.policy_name.clone(),
            policy_arn: policy_arn.to_string(),
        });
        policy.attachment_count += 1;
    }
    Ok(())
}

pub async fn detach_role_policy(client: &MockCloudClient, role_name: &str, policy_arn: &str) -> Result<(), CloudError> {
    client.record("detach_role_policy", &format!("{} {}", role_name, policy_arn))?;

    // Same lock order as attach_role_policy: policies, then attachments
    let mut policies = lock(&client.policies);
    let mut attachments = lock(&client.role_attachments);
    let attached = attachments
        .get_mut(role_name)
        .ok_or_else(|| CloudError::NotFound(format!("Role {} not found", role_name)))?;
    let before = attached.len();
    attached.retain(|p| p.policy_arn != policy_arn);
    if attached.len() == before {
        return Err(CloudError::NotFound(format!(
            "Policy {} is not attached to role {}",
            policy_arn, role_name
        )));
    }

    if let Some(policy) = policies.get_mut(policy_arn) {
        policy.attachment_count = policy.attachment_count.saturating_sub(1);
    }
    Ok(())
}
