//! Mock CloudClient for unit testing
//!
//! This module provides a mock implementation of CloudClientTrait that can be used
//! in unit tests without a provisioning gateway.
//!
//! The mock is organized into service-specific modules:
//! - `iam.rs` - roles, managed policies, attachments, role propagation
//! - `lambda.rs` - functions, lifecycle transitions, invocation
//! - `storage.rs` - bucket existence and access
//! - `network.rs` - VPCs, subnets, security groups
//! - `helpers.rs` - ARN builders and fixtures
//!
//! Every trait call is recorded so tests can assert on the exact set of
//! mutating calls a reconciliation issued.

mod helpers;
mod iam;
mod lambda;
mod network;
mod storage;

use crate::error::CloudError;
use crate::models::*;
use crate::cloud_trait::CloudClientTrait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use helpers::Helpers;

/// Operations that change provider state
pub const MUTATING_OPERATIONS: &[&str] = &[
    "create_role",
    "update_assume_role_policy",
    "delete_role",
    "create_policy",
    "update_policy_document",
    "delete_policy",
    "attach_role_policy",
    "detach_role_policy",
    "create_function",
    "update_function_code",
    "update_function_configuration",
];

/// Error kind returned by an injected failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    PermissionDenied,
    NotFound,
    Conflict,
    Unavailable,
}

impl FailureKind {
    fn to_error(self, operation: &str, detail: &str) -> CloudError {
        let message = format!("injected failure for {} {}", operation, detail);
        match self {
            Self::PermissionDenied => CloudError::PermissionDenied(message),
            Self::NotFound => CloudError::NotFound(message),
            Self::Conflict => CloudError::conflict(detail, message),
            Self::Unavailable => CloudError::Unavailable(message),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InjectedFailure {
    kind: FailureKind,
    remaining: usize,
}

/// How a bucket answers `HeadBucket`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BucketAccess {
    Readable,
    Forbidden,
}

/// Timing knobs for simulated eventual consistency
#[derive(Debug, Clone, Default)]
pub(crate) struct MockSettings {
    /// `role_is_assumable` answers false this many times after a role is created
    pub(crate) role_propagation_polls: usize,
    /// `get_function` reports a transitional state this many times after a mutation
    pub(crate) function_settle_polls: usize,
}

/// Mock CloudClient for testing
///
/// This mock stores resources in memory and can be configured to return
/// specific responses for testing different scenarios.
#[derive(Clone)]
pub struct MockCloudClient {
    pub(crate) helpers: Helpers,
    // In-memory storage for resources
    pub(crate) roles: Arc<Mutex<HashMap<String, Role>>>,
    pub(crate) role_attachments: Arc<Mutex<HashMap<String, Vec<AttachedPolicy>>>>,
    pub(crate) policies: Arc<Mutex<HashMap<String, ManagedPolicy>>>,
    pub(crate) role_propagation: Arc<Mutex<HashMap<String, usize>>>,
    pub(crate) buckets: Arc<Mutex<HashMap<String, BucketAccess>>>,
    pub(crate) functions: Arc<Mutex<HashMap<String, FunctionConfiguration>>>,
    pub(crate) function_settling: Arc<Mutex<HashMap<String, usize>>>,
    pub(crate) update_failures: Arc<Mutex<HashMap<String, String>>>,
    pub(crate) invoke_responses: Arc<Mutex<HashMap<String, InvocationResponse>>>,
    pub(crate) vpcs: Arc<Mutex<HashMap<String, Vpc>>>,
    pub(crate) subnets: Arc<Mutex<HashMap<String, Subnet>>>,
    pub(crate) security_groups: Arc<Mutex<HashMap<String, SecurityGroup>>>,
    // Behaviour
    pub(crate) settings: Arc<Mutex<MockSettings>>,
    pub(crate) failures: Arc<Mutex<HashMap<String, InjectedFailure>>>,
    pub(crate) calls: Arc<Mutex<Vec<String>>>,
    // Counter for generating IDs
    pub(crate) next_id: Arc<Mutex<u64>>,
}

/// Lock a store, recovering the data if a panicking test poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MockCloudClient {
    fn default() -> Self {
        Self::new("us-east-1")
    }
}

impl MockCloudClient {
    /// Create a new mock client for a region
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            helpers: Helpers::new("123456789012".to_string(), region.into()),
            roles: Arc::new(Mutex::new(HashMap::new())),
            role_attachments: Arc::new(Mutex::new(HashMap::new())),
            policies: Arc::new(Mutex::new(HashMap::new())),
            role_propagation: Arc::new(Mutex::new(HashMap::new())),
            buckets: Arc::new(Mutex::new(HashMap::new())),
            functions: Arc::new(Mutex::new(HashMap::new())),
            function_settling: Arc::new(Mutex::new(HashMap::new())),
            update_failures: Arc::new(Mutex::new(HashMap::new())),
            invoke_responses: Arc::new(Mutex::new(HashMap::new())),
            vpcs: Arc::new(Mutex::new(HashMap::new())),
            subnets: Arc::new(Mutex::new(HashMap::new())),
            security_groups: Arc::new(Mutex::new(HashMap::new())),
            settings: Arc::new(Mutex::new(MockSettings::default())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// ARN builders bound to this mock's account and region
    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// Add a readable bucket (for test setup)
    pub fn add_bucket(&self, name: &str) {
        lock(&self.buckets).insert(name.to_string(), BucketAccess::Readable);
    }

    /// Add a bucket the caller may not read (for test setup)
    pub fn add_forbidden_bucket(&self, name: &str) {
        lock(&self.buckets).insert(name.to_string(), BucketAccess::Forbidden);
    }

    /// Add a VPC (for test setup)
    pub fn add_vpc(&self, vpc_id: &str, state: NetworkResourceState) {
        lock(&self.vpcs).insert(
            vpc_id.to_string(),
            Vpc {
                vpc_id: vpc_id.to_string(),
                state,
                cidr_block: Some("10.0.0.0/16".to_string()),
                name: None,
            },
        );
    }

    /// Add a subnet (for test setup)
    pub fn add_subnet(&self, subnet_id: &str, vpc_id: &str, state: NetworkResourceState) {
        lock(&self.subnets).insert(
            subnet_id.to_string(),
            Subnet {
                subnet_id: subnet_id.to_string(),
                vpc_id: vpc_id.to_string(),
                state,
                availability_zone: Some(format!("{}a", self.helpers.region())),
                cidr_block: None,
                name: None,
            },
        );
    }

    /// Add a security group (for test setup)
    pub fn add_security_group(&self, group_id: &str, vpc_id: &str) {
        lock(&self.security_groups).insert(
            group_id.to_string(),
            SecurityGroup {
                group_id: group_id.to_string(),
                group_name: group_id.to_string(),
                vpc_id: vpc_id.to_string(),
                description: Some(format!("{} security group", group_id)),
            },
        );
    }

    /// Set the `Name` tag of a VPC or subnet (for test setup)
    pub fn set_name_tag(&self, resource_id: &str, name: &str) {
        if let Some(vpc) = lock(&self.vpcs).get_mut(resource_id) {
            vpc.name = Some(name.to_string());
        }
        if let Some(subnet) = lock(&self.subnets).get_mut(resource_id) {
            subnet.name = Some(name.to_string());
        }
    }

    /// Insert a function as-is, bypassing lifecycle simulation (for test setup)
    pub fn seed_function(&self, function: FunctionConfiguration) {
        lock(&self.functions).insert(function.function_name.clone(), function);
    }

    /// Make `role_is_assumable` report false `polls` times after each role creation
    pub fn set_role_propagation_polls(&self, polls: usize) {
        lock(&self.settings).role_propagation_polls = polls;
    }

    /// Make `get_function` report a transitional state `polls` times after each mutation
    pub fn set_function_settle_polls(&self, polls: usize) {
        lock(&self.settings).function_settle_polls = polls;
    }

    /// Fail the next `times` calls of `operation` with `kind`
    pub fn fail_operation(&self, operation: &str, kind: FailureKind, times: usize) {
        lock(&self.failures).insert(
            operation.to_string(),
            InjectedFailure {
                kind,
                remaining: times,
            },
        );
    }

    /// Make the next update of `function_name` settle in `LastUpdateStatus::Failed`
    pub fn fail_next_function_update(&self, function_name: &str, reason: &str) {
        lock(&self.update_failures).insert(function_name.to_string(), reason.to_string());
    }

    /// Fix the response `invoke_function` returns for a function
    pub fn set_invoke_response(&self, function_name: &str, response: InvocationResponse) {
        lock(&self.invoke_responses).insert(function_name.to_string(), response);
    }

    /// Current state of a role
    pub fn role(&self, role_name: &str) -> Option<Role> {
        lock(&self.roles).get(role_name).cloned()
    }

    /// Current state of a managed policy
    pub fn policy_by_name(&self, policy_name: &str) -> Option<ManagedPolicy> {
        lock(&self.policies)
            .values()
            .find(|p| p.policy_name == policy_name)
            .cloned()
    }

    /// Policies attached to a role
    pub fn attached_policies(&self, role_name: &str) -> Vec<AttachedPolicy> {
        lock(&self.role_attachments)
            .get(role_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Current state of a function, without advancing its lifecycle
    pub fn function(&self, function_name: &str) -> Option<FunctionConfiguration> {
        lock(&self.functions).get(function_name).cloned()
    }

    /// Every call made so far, as `"operation detail"`
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Calls that changed provider state
    pub fn mutating_calls(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter(|call| {
                let operation = call.split_whitespace().next().unwrap_or_default();
                MUTATING_OPERATIONS.contains(&operation)
            })
            .cloned()
            .collect()
    }

    /// Number of recorded calls of one operation
    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.split_whitespace().next() == Some(operation))
            .count()
    }

    /// Forget recorded calls (e.g., after test setup)
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Record a call and apply any injected failure for it
    pub(crate) fn record(&self, operation: &str, detail: &str) -> Result<(), CloudError> {
        lock(&self.calls).push(format!("{} {}", operation, detail));

        let mut failures = lock(&self.failures);
        if let Some(failure) = failures.get_mut(operation) {
            if failure.remaining > 0 {
                failure.remaining -= 1;
                return Err(failure.kind.to_error(operation, detail));
            }
        }
        Ok(())
    }

    /// Generate next ID
    pub(crate) fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        current
    }

    pub(crate) fn settings(&self) -> MockSettings {
        lock(&self.settings).clone()
    }
}

#[async_trait::async_trait]
impl CloudClientTrait for MockCloudClient {
    fn region(&self) -> &str {
        self.helpers.region()
    }

    // IAM Operations - delegated to iam module
    async fn get_role(&self, role_name: &str) -> Result<Option<Role>, CloudError> {
        iam::get_role(self, role_name).await
    }

    async fn create_role(&self, role_name: &str, trust_policy: &PolicyDocument, description: &str) -> Result<Role, CloudError> {
        iam::create_role(self, role_name, trust_policy, description).await
    }

    async fn update_assume_role_policy(&self, role_name: &str, trust_policy: &PolicyDocument) -> Result<(), CloudError> {
        iam::update_assume_role_policy(self, role_name, trust_policy).await
    }

    async fn delete_role(&self, role_name: &str) -> Result<(), CloudError> {
        iam::delete_role(self, role_name).await
    }

    async fn role_is_assumable(&self, role_arn: &str) -> Result<bool, CloudError> {
        iam::role_is_assumable(self, role_arn).await
    }

    async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<AttachedPolicy>, CloudError> {
        iam::list_attached_role_policies(self, role_name).await
    }

    async fn get_policy_by_name(&self, policy_name: &str) -> Result<Option<ManagedPolicy>, CloudError> {
        iam::get_policy_by_name(self, policy_name).await
    }

    async fn create_policy(&self, policy_name: &str, document: &PolicyDocument, description: &str) -> Result<ManagedPolicy, CloudError> {
        iam::create_policy(self, policy_name, document, description).await
    }

    async fn update_policy_document(&self, policy_arn: &str, document: &PolicyDocument) -> Result<ManagedPolicy, CloudError> {
        iam::update_policy_document(self, policy_arn, document).await
    }

    async fn delete_policy(&self, policy_arn: &str) -> Result<(), CloudError> {
        iam::delete_policy(self, policy_arn).await
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), CloudError> {
        iam::attach_role_policy(self, role_name, policy_arn).await
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), CloudError> {
        iam::detach_role_policy(self, role_name, policy_arn).await
    }

    // S3 Operations - delegated to storage module
    async fn head_bucket(&self, bucket: &str) -> Result<BucketInfo, CloudError> {
        storage::head_bucket(self, bucket).await
    }

    // Lambda Operations - delegated to lambda module
    async fn get_function(&self, function_name: &str) -> Result<Option<FunctionConfiguration>, CloudError> {
        lambda::get_function(self, function_name).await
    }

    async fn list_functions(&self) -> Result<Vec<FunctionConfiguration>, CloudError> {
        lambda::list_functions(self).await
    }

    async fn create_function(&self, request: &CreateFunctionRequest) -> Result<FunctionConfiguration, CloudError> {
        lambda::create_function(self, request).await
    }

    async fn update_function_code(&self, function_name: &str, image_uri: &str) -> Result<FunctionConfiguration, CloudError> {
        lambda::update_function_code(self, function_name, image_uri).await
    }

    async fn update_function_configuration(&self, function_name: &str, request: &UpdateFunctionConfigurationRequest) -> Result<FunctionConfiguration, CloudError> {
        lambda::update_function_configuration(self, function_name, request).await
    }

    async fn invoke_function(&self, function_name: &str, payload: &serde_json::Value) -> Result<InvocationResponse, CloudError> {
        lambda::invoke_function(self, function_name, payload).await
    }

    // EC2 Operations - delegated to network module
    async fn describe_vpc(&self, vpc_id: &str) -> Result<Option<Vpc>, CloudError> {
        network::describe_vpc(self, vpc_id).await
    }

    async fn describe_subnets(&self, subnet_ids: &[String]) -> Result<Vec<Subnet>, CloudError> {
        network::describe_subnets(self, subnet_ids).await
    }

    async fn describe_security_groups(&self, group_ids: &[String]) -> Result<Vec<SecurityGroup>, CloudError> {
        network::describe_security_groups(self, group_ids).await
    }

    async fn list_vpcs(&self) -> Result<Vec<Vpc>, CloudError> {
        network::list_vpcs(self).await
    }

    async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, CloudError> {
        network::list_subnets(self, vpc_id).await
    }

    async fn list_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroup>, CloudError> {
        network::list_security_groups(self, vpc_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_injected_failure_is_consumed() {
        let mock = MockCloudClient::default();
        mock.fail_operation("get_role", FailureKind::Unavailable, 1);

        assert!(matches!(mock.get_role("r").await, Err(CloudError::Unavailable(_))));
        assert!(mock.get_role("r").await.unwrap().is_none());
        assert_eq!(mock.call_count("get_role"), 2);
    }

    #[tokio::test]
    async fn test_mutating_calls_filter_reads() {
        let mock = MockCloudClient::default();
        let trust = PolicyDocument::new(vec![]);
        mock.get_role("r").await.unwrap();
        mock.create_role("r", &trust, "test").await.unwrap();
        mock.get_role("r").await.unwrap();

        assert_eq!(mock.calls().len(), 3);
        assert_eq!(mock.mutating_calls(), vec!["create_role r".to_string()]);
    }
}
