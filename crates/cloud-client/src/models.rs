//! Provider API models
//!
//! These models follow the AWS IAM, Lambda, S3 and EC2 response shapes as
//! relayed by the provisioning gateway (PascalCase field names).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// IAM policy language version used for every document this crate builds
pub const POLICY_LANGUAGE_VERSION: &str = "2012-10-17";

/// Statement effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// A single IAM policy statement
///
/// `Action` and `Resource` accept both the string and the list form on input
/// and are always emitted as lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<serde_json::Value>,
    #[serde(deserialize_with = "one_or_many")]
    pub action: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<String>,
}

impl PolicyStatement {
    /// Copy of the statement with actions and resources sorted and de-duplicated
    fn normalized(&self) -> Self {
        let mut action = self.action.clone();
        action.sort();
        action.dedup();
        let mut resource = self.resource.clone();
        resource.sort();
        resource.dedup();
        Self {
            action,
            resource,
            ..self.clone()
        }
    }

    fn sort_key(&self) -> (Option<String>, Effect, Vec<String>, Vec<String>) {
        (
            self.sid.clone(),
            self.effect,
            self.action.clone(),
            self.resource.clone(),
        )
    }
}

/// An IAM policy document (trust policy or permissions policy)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Create a document with the current policy language version
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_LANGUAGE_VERSION.to_string(),
            statement,
        }
    }

    /// Canonical form: statement order and list order carry no meaning in IAM
    pub fn normalized(&self) -> Self {
        let mut statement: Vec<PolicyStatement> =
            self.statement.iter().map(PolicyStatement::normalized).collect();
        statement.sort_by_key(PolicyStatement::sort_key);
        Self {
            version: self.version.clone(),
            statement,
        }
    }

    /// Semantic equality (ignores ordering)
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }

    /// Find a statement by its `Sid`
    pub fn statement_by_sid(&self, sid: &str) -> Option<&PolicyStatement> {
        self.statement.iter().find(|s| s.sid.as_deref() == Some(sid))
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// IAM role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    pub role_name: String,
    /// Stable unique id (`AROA...`); changes when a role is deleted and recreated
    pub role_id: String,
    pub arn: String,
    pub assume_role_policy_document: PolicyDocument,
    #[serde(default)]
    pub description: Option<String>,
    pub create_date: DateTime<Utc>,
}

/// Customer-managed IAM policy with its default version document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedPolicy {
    pub policy_name: String,
    pub arn: String,
    pub default_version_id: String,
    pub document: PolicyDocument,
    #[serde(default)]
    pub attachment_count: u32,
}

/// Managed policy attached to a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedPolicy {
    pub policy_name: String,
    pub policy_arn: String,
}

/// Result of a `HeadBucket` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketInfo {
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
}

/// Lambda function `State`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionState {
    Pending,
    Active,
    Inactive,
    Failed,
}

/// Lambda function `LastUpdateStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastUpdateStatus {
    InProgress,
    Successful,
    Failed,
}

/// VPC placement of a function
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcConfig {
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
}

impl VpcConfig {
    /// An empty config detaches the function from any VPC
    pub fn is_empty(&self) -> bool {
        self.subnet_ids.is_empty() && self.security_group_ids.is_empty()
    }
}

/// Lambda function configuration (container image package type)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionConfiguration {
    pub function_name: String,
    pub function_arn: String,
    pub role: String,
    pub image_uri: String,
    pub memory_size: u32,
    pub timeout: u32,
    pub state: FunctionState,
    #[serde(default)]
    pub state_reason: Option<String>,
    #[serde(default)]
    pub last_update_status: Option<LastUpdateStatus>,
    #[serde(default)]
    pub last_update_status_reason: Option<String>,
    #[serde(default)]
    pub vpc_config: Option<VpcConfig>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    pub last_modified: DateTime<Utc>,
}

impl FunctionConfiguration {
    /// Whether the function is in a state the provider is still working on
    pub fn is_transitioning(&self) -> bool {
        self.state == FunctionState::Pending
            || self.last_update_status == Some(LastUpdateStatus::InProgress)
    }

    /// Attached VPC config, treating an empty config as no attachment
    pub fn attached_vpc(&self) -> Option<&VpcConfig> {
        self.vpc_config.as_ref().filter(|vpc| !vpc.is_empty())
    }
}

/// `CreateFunction` request for an image-packaged function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateFunctionRequest {
    pub function_name: String,
    pub role: String,
    pub image_uri: String,
    pub memory_size: u32,
    pub timeout: u32,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfig>,
}

/// `UpdateFunctionConfiguration` request; `None` fields are left unchanged
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateFunctionConfigurationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfig>,
}

impl UpdateFunctionConfigurationRequest {
    /// True when the request would not change anything
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Synchronous (`RequestResponse`) invocation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    #[serde(default)]
    pub function_error: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// EC2 resource availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkResourceState {
    Pending,
    Available,
}

/// EC2 VPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vpc {
    pub vpc_id: String,
    pub state: NetworkResourceState,
    #[serde(default)]
    pub cidr_block: Option<String>,
    /// Value of the `Name` tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// EC2 subnet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subnet {
    pub subnet_id: String,
    pub vpc_id: String,
    pub state: NetworkResourceState,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub cidr_block: Option<String>,
    /// Value of the `Name` tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// EC2 security group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityGroup {
    pub group_id: String,
    pub group_name: String,
    pub vpc_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
