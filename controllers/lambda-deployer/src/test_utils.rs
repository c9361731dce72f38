//! Test utilities for unit testing reconcilers
//!
//! Builders for specs, mock accounts and reconcilers wired to them.

use crate::reconcile_helpers::{self, WaitPolicy};
use crate::reconciler::{DeployContext, Reconciler};
use cloud_client::{FunctionConfiguration, MockCloudClient, NetworkResourceState};
use deploy_spec::DeploymentSpec;
use std::time::Duration;

pub const TEST_IMAGE: &str = "acct.dkr.ecr.region.amazonaws.com/repo:tag";
pub const TEST_BUCKET: &str = "data-bucket";

/// Spec for function `f1` on `data-bucket`, no network
pub fn create_test_spec() -> DeploymentSpec {
    DeploymentSpec::new(TEST_IMAGE, "f1", TEST_BUCKET)
}

/// Spec for `f1` placed in VPC `v1`
pub fn create_test_network_spec() -> DeploymentSpec {
    create_test_spec().with_network(
        Some("v1"),
        vec!["s1".to_string(), "s2".to_string()],
        vec!["sg1".to_string()],
    )
}

/// Mock account with the test bucket and a usable VPC `v1`
pub fn create_test_account() -> MockCloudClient {
    let mock = MockCloudClient::default();
    mock.add_bucket(TEST_BUCKET);
    mock.add_vpc("v1", NetworkResourceState::Available);
    mock.add_subnet("s1", "v1", NetworkResourceState::Available);
    mock.add_subnet("s2", "v1", NetworkResourceState::Available);
    mock.add_security_group("sg1", "v1");
    mock
}

/// Wait bounds small enough for unit tests
pub fn test_wait_policy() -> WaitPolicy {
    WaitPolicy {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        deadline: Duration::from_secs(5),
        max_attempts: 20,
    }
}

/// Reconciler sharing state with `mock`
pub fn create_test_reconciler(mock: &MockCloudClient) -> Reconciler {
    Reconciler::new(Box::new(mock.clone())).with_wait_policy(test_wait_policy())
}

pub fn create_test_context(spec: &DeploymentSpec) -> DeployContext {
    DeployContext::new(spec)
}

/// Seed an execution role (with its execution policy attached) directly in `mock`
pub async fn seed_role(mock: &MockCloudClient, role_name: &str) -> cloud_client::Role {
    use cloud_client::CloudClientTrait;

    let role = mock
        .create_role(role_name, &reconcile_helpers::lambda_trust_policy(), "seeded")
        .await
        .unwrap();
    let policy = mock
        .create_policy(
            &reconcile_helpers::execution_policy_name(role_name),
            &reconcile_helpers::execution_policy(),
            "seeded",
        )
        .await
        .unwrap();
    mock.attach_role_policy(role_name, &policy.arn).await.unwrap();
    role
}

/// An active function using `role_arn`, for `seed_function`
pub fn create_test_function(mock: &MockCloudClient, name: &str, role_arn: &str) -> FunctionConfiguration {
    mock.helpers().active_function(name, role_arn, TEST_IMAGE)
}
