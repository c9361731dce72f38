//! Deployment result types
//!
//! These types describe what a reconciliation converged to. They are
//! serialized as-is for `--output json`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Statement id the deployer owns inside the bucket-access policy
pub const BUCKET_ACCESS_SID: &str = "LambdaDeployerBucketAccess";

/// Actions granted on the deployment bucket
pub const BUCKET_ACTIONS: [&str; 4] = ["s3:GetObject", "s3:PutObject", "s3:ListBucket", "s3:DeleteObject"];

/// Lifecycle of the compute function as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Absent,
    Creating,
    Active,
    Updating,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::Active => "active",
            Self::Updating => "updating",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Bucket permissions bound to the execution role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub bucket: String,
    pub policy_arn: String,
    pub statement_id: String,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

impl AccessGrant {
    /// Resource ARNs covering exactly one bucket and its objects
    pub fn bucket_resources(bucket: &str) -> Vec<String> {
        vec![format!("arn:aws:s3:::{}", bucket), format!("arn:aws:s3:::{}/*", bucket)]
    }

    pub fn for_bucket(bucket: &str, policy_arn: impl Into<String>) -> Self {
        Self {
            bucket: bucket.to_string(),
            policy_arn: policy_arn.into(),
            statement_id: BUCKET_ACCESS_SID.to_string(),
            actions: BUCKET_ACTIONS.iter().map(|a| a.to_string()).collect(),
            resources: Self::bucket_resources(bucket),
        }
    }
}

/// VPC placement applied to the function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAttachment {
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
}

/// Phase a fatal error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Validation,
    Role,
    Access,
    Function,
    Network,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Role => "role",
            Self::Access => "access",
            Self::Function => "function",
            Self::Network => "network",
        };
        f.write_str(s)
    }
}

/// Reconciliation progress; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    RoleReconciled,
    AccessBound,
    FunctionConverged,
    NetworkBound,
    Done,
}

impl Stage {
    /// Phase that runs after this stage; a failure while in it is attributed there
    pub fn next_phase(self) -> Phase {
        match self {
            Self::Start => Phase::Role,
            Self::RoleReconciled => Phase::Access,
            Self::AccessBound => Phase::Function,
            Self::FunctionConverged | Self::NetworkBound | Self::Done => Phase::Network,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::RoleReconciled => "role_reconciled",
            Self::AccessBound => "access_bound",
            Self::FunctionConverged => "function_converged",
            Self::NetworkBound => "network_bound",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// Outcome of a deployment, complete or partial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub function_name: String,
    pub function_arn: Option<String>,
    pub role_name: String,
    pub role_arn: Option<String>,
    /// Provider-assigned unique id; changes when the role is recreated
    pub role_id: Option<String>,
    pub state: LifecycleState,
    pub stage: Stage,
    pub access_grant: Option<AccessGrant>,
    pub network: Option<NetworkAttachment>,
    pub warnings: Vec<String>,
}

impl DeploymentResult {
    pub fn new(function_name: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            function_arn: None,
            role_name: role_name.into(),
            role_arn: None,
            role_id: None,
            state: LifecycleState::Absent,
            stage: Stage::Start,
            access_grant: None,
            network: None,
            warnings: Vec::new(),
        }
    }

    /// Move to `stage`; a backwards move is ignored
    pub fn advance(&mut self, stage: Stage) {
        if stage > self.stage {
            self.stage = stage;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_only_moves_forward() {
        let mut result = DeploymentResult::new("f1", "f1-role");
        result.advance(Stage::AccessBound);
        result.advance(Stage::RoleReconciled);
        assert_eq!(result.stage, Stage::AccessBound);
        result.advance(Stage::Done);
        assert_eq!(result.stage, Stage::Done);
    }

    #[test]
    fn test_phase_derived_from_stage() {
        assert_eq!(Stage::Start.next_phase(), Phase::Role);
        assert_eq!(Stage::RoleReconciled.next_phase(), Phase::Access);
        assert_eq!(Stage::AccessBound.next_phase(), Phase::Function);
        assert_eq!(Stage::FunctionConverged.next_phase(), Phase::Network);
    }

    #[test]
    fn test_grant_scoped_to_one_bucket() {
        let grant = AccessGrant::for_bucket("data-bucket", "arn:aws:iam::1:policy/p");
        assert_eq!(
            grant.resources,
            vec!["arn:aws:s3:::data-bucket".to_string(), "arn:aws:s3:::data-bucket/*".to_string()]
        );
        assert_eq!(grant.actions.len(), 4);
        assert_eq!(grant.statement_id, BUCKET_ACCESS_SID);
    }

    #[test]
    fn test_result_serializes_snake_case() {
        let mut result = DeploymentResult::new("f1", "f1-role");
        result.state = LifecycleState::Active;
        result.advance(Stage::FunctionConverged);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["state"], "active");
        assert_eq!(json["stage"], "function_converged");
    }
}
