//! CloudClient trait for mocking
//!
//! This trait abstracts the provider APIs so reconcilers can run against the
//! HTTP client in production and against `MockCloudClient` in unit tests.

use crate::error::CloudError;
use crate::models::*;

/// Trait for provider API operations
///
/// Lookups return `Ok(None)` for absent resources instead of
/// `Err(CloudError::NotFound)`, so "absent" is a normal branch for callers.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait CloudClientTrait: Send + Sync {
    /// Region the client operates in
    fn region(&self) -> &str;

    // IAM Operations
    async fn get_role(&self, role_name: &str) -> Result<Option<Role>, CloudError>;
    async fn create_role(&self, role_name: &str, trust_policy: &PolicyDocument, description: &str) -> Result<Role, CloudError>;
    async fn update_assume_role_policy(&self, role_name: &str, trust_policy: &PolicyDocument) -> Result<(), CloudError>;
    async fn delete_role(&self, role_name: &str) -> Result<(), CloudError>;
    /// Whether the compute service can already assume the role (IAM propagation)
    async fn role_is_assumable(&self, role_arn: &str) -> Result<bool, CloudError>;
    async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<AttachedPolicy>, CloudError>;
    async fn get_policy_by_name(&self, policy_name: &str) -> Result<Option<ManagedPolicy>, CloudError>;
    async fn create_policy(&self, policy_name: &str, document: &PolicyDocument, description: &str) -> Result<ManagedPolicy, CloudError>;
    /// Publish a new default version; the policy ARN is preserved
    async fn update_policy_document(&self, policy_arn: &str, document: &PolicyDocument) -> Result<ManagedPolicy, CloudError>;
    async fn delete_policy(&self, policy_arn: &str) -> Result<(), CloudError>;
    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), CloudError>;
    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), CloudError>;

    // S3 Operations
    async fn head_bucket(&self, bucket: &str) -> Result<BucketInfo, CloudError>;

    // Lambda Operations
    async fn get_function(&self, function_name: &str) -> Result<Option<FunctionConfiguration>, CloudError>;
    async fn list_functions(&self) -> Result<Vec<FunctionConfiguration>, CloudError>;
    async fn create_function(&self, request: &CreateFunctionRequest) -> Result<FunctionConfiguration, CloudError>;
    async fn update_function_code(&self, function_name: &str, image_uri: &str) -> Result<FunctionConfiguration, CloudError>;
    async fn update_function_configuration(&self, function_name: &str, request: &UpdateFunctionConfigurationRequest) -> Result<FunctionConfiguration, CloudError>;
    async fn invoke_function(&self, function_name: &str, payload: &serde_json::Value) -> Result<InvocationResponse, CloudError>;

    // EC2 Operations
    async fn describe_vpc(&self, vpc_id: &str) -> Result<Option<Vpc>, CloudError>;
    /// Returns only the subnets that exist; callers compare against the request
    async fn describe_subnets(&self, subnet_ids: &[String]) -> Result<Vec<Subnet>, CloudError>;
    /// Returns only the security groups that exist; callers compare against the request
    async fn describe_security_groups(&self, group_ids: &[String]) -> Result<Vec<SecurityGroup>, CloudError>;
    /// VPCs in the `available` state
    async fn list_vpcs(&self) -> Result<Vec<Vpc>, CloudError>;
    /// Available subnets of one VPC
    async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, CloudError>;
    async fn list_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroup>, CloudError>;
}
