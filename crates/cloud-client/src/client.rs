//! Provisioning gateway client
//!
//! Implements [`CloudClientTrait`] over the gateway's REST surface, which
//! relays to the IAM, Lambda, S3 and EC2 APIs of the account it holds
//! credentials for:
//!
//! - `/iam/roles`, `/iam/policies`
//! - `/lambda/functions`
//! - `/s3/buckets`
//! - `/ec2/vpcs`, `/ec2/subnets`, `/ec2/security-groups`

use crate::common::query::{encode_segment, ids_query, with_query};
use crate::common::HttpClient;
use crate::error::CloudError;
use crate::models::*;
use crate::cloud_trait::CloudClientTrait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Provisioning gateway client
pub struct CloudClient {
    http: HttpClient,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumableResponse {
    assumable: bool,
}

impl CloudClient {
    /// Create a new gateway client
    ///
    /// # Arguments
    /// * `base_url` - Gateway base URL (e.g., "http://localhost:4566")
    /// * `token` - Bearer token for the gateway
    /// * `region` - Region every request is routed to
    pub fn new(base_url: String, token: String, region: String) -> Result<Self, CloudError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(CloudError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token, region),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Validate the token with a lightweight authenticated request
    pub async fn validate_token(&self) -> Result<(), CloudError> {
        debug!("Validating gateway token and connectivity");
        let _: serde_json::Value = self.http.get("/status").await?;
        debug!("Token validated successfully");
        Ok(())
    }
}

#[async_trait::async_trait]
impl CloudClientTrait for CloudClient {
    fn region(&self) -> &str {
        self.http.region()
    }

    // IAM Operations
    async fn get_role(&self, role_name: &str) -> Result<Option<Role>, CloudError> {
        self.http
            .get_optional(&format!("/iam/roles/{}", encode_segment(role_name)))
            .await
    }

    async fn create_role(&self, role_name: &str, trust_policy: &PolicyDocument, description: &str) -> Result<Role, CloudError> {
        let body = serde_json::json!({
            "RoleName": role_name,
            "AssumeRolePolicyDocument": trust_policy,
            "Description": description,
        });
        self.http.post("/iam/roles", &body).await
    }

    async fn update_assume_role_policy(&self, role_name: &str, trust_policy: &PolicyDocument) -> Result<(), CloudError> {
        self.http
            .put_no_content(
                &format!("/iam/roles/{}/trust-policy", encode_segment(role_name)),
                trust_policy,
            )
            .await
    }

    async fn delete_role(&self, role_name: &str) -> Result<(), CloudError> {
        self.http
            .delete(&format!("/iam/roles/{}", encode_segment(role_name)))
            .await
    }

    async fn role_is_assumable(&self, role_arn: &str) -> Result<bool, CloudError> {
        let response: AssumableResponse = self
            .http
            .get(&with_query("/iam/roles/assumable", &[("RoleArn", role_arn)]))
            .await?;
        Ok(response.assumable)
    }

    async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<AttachedPolicy>, CloudError> {
        self.http
            .fetch_all_pages(&format!(
                "/iam/roles/{}/attached-policies",
                encode_segment(role_name)
            ))
            .await
    }

    async fn get_policy_by_name(&self, policy_name: &str) -> Result<Option<ManagedPolicy>, CloudError> {
        self.http
            .get_optional(&format!("/iam/policies/by-name/{}", encode_segment(policy_name)))
            .await
    }

    async fn create_policy(&self, policy_name: &str, document: &PolicyDocument, description: &str) -> Result<ManagedPolicy, CloudError> {
        let body = serde_json::json!({
            "PolicyName": policy_name,
            "PolicyDocument": document,
            "Description": description,
        });
        self.http.post("/iam/policies", &body).await
    }

    async fn update_policy_document(&self, policy_arn: &str, document: &PolicyDocument) -> Result<ManagedPolicy, CloudError> {
        // The gateway prunes the oldest non-default version when the
        // five-version limit would be exceeded.
        let body = serde_json::json!({
            "PolicyDocument": document,
            "SetAsDefault": true,
        });
        self.http
            .post(&format!("/iam/policies/{}/versions", encode_segment(policy_arn)), &body)
            .await
    }

    async fn delete_policy(&self, policy_arn: &str) -> Result<(), CloudError> {
        self.http
            .delete(&format!("/iam/policies/{}", encode_segment(policy_arn)))
            .await
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), CloudError> {
        self.http
            .put_no_content(
                &format!(
                    "/iam/roles/{}/attached-policies/{}",
                    encode_segment(role_name),
                    encode_segment(policy_arn)
                ),
                &serde_json::json!({}),
            )
            .await
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), CloudError> {
        self.http
            .delete(&format!(
                "/iam/roles/{}/attached-policies/{}",
                encode_segment(role_name),
                encode_segment(policy_arn)
            ))
            .await
    }

    // S3 Operations
    async fn head_bucket(&self, bucket: &str) -> Result<BucketInfo, CloudError> {
        self.http
            .get(&format!("/s3/buckets/{}", encode_segment(bucket)))
            .await
    }

    // Lambda Operations
    async fn get_function(&self, function_name: &str) -> Result<Option<FunctionConfiguration>, CloudError> {
        self.http
            .get_optional(&format!("/lambda/functions/{}", encode_segment(function_name)))
            .await
    }

    async fn list_functions(&self) -> Result<Vec<FunctionConfiguration>, CloudError> {
        self.http.fetch_all_pages("/lambda/functions").await
    }

    async fn create_function(&self, request: &CreateFunctionRequest) -> Result<FunctionConfiguration, CloudError> {
        self.http.post("/lambda/functions", request).await
    }

    async fn update_function_code(&self, function_name: &str, image_uri: &str) -> Result<FunctionConfiguration, CloudError> {
        let body = serde_json::json!({ "ImageUri": image_uri });
        self.http
            .put(&format!("/lambda/functions/{}/code", encode_segment(function_name)), &body)
            .await
    }

    async fn update_function_configuration(&self, function_name: &str, request: &UpdateFunctionConfigurationRequest) -> Result<FunctionConfiguration, CloudError> {
        self.http
            .put(
                &format!("/lambda/functions/{}/configuration", encode_segment(function_name)),
                request,
            )
            .await
    }

    async fn invoke_function(&self, function_name: &str, payload: &serde_json::Value) -> Result<InvocationResponse, CloudError> {
        self.http
            .post(
                &format!("/lambda/functions/{}/invocations", encode_segment(function_name)),
                payload,
            )
            .await
    }

    // EC2 Operations
    async fn describe_vpc(&self, vpc_id: &str) -> Result<Option<Vpc>, CloudError> {
        self.http
            .get_optional(&format!("/ec2/vpcs/{}", encode_segment(vpc_id)))
            .await
    }

    async fn describe_subnets(&self, subnet_ids: &[String]) -> Result<Vec<Subnet>, CloudError> {
        if subnet_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.http.fetch_all_pages(&ids_query("/ec2/subnets", subnet_ids)).await
    }

    async fn describe_security_groups(&self, group_ids: &[String]) -> Result<Vec<SecurityGroup>, CloudError> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.http
            .fetch_all_pages(&ids_query("/ec2/security-groups", group_ids))
            .await
    }

    async fn list_vpcs(&self) -> Result<Vec<Vpc>, CloudError> {
        let vpcs: Vec<Vpc> = self.http.fetch_all_pages("/ec2/vpcs").await?;
        Ok(vpcs
            .into_iter()
            .filter(|v| v.state == NetworkResourceState::Available)
            .collect())
    }

    async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, CloudError> {
        let subnets: Vec<Subnet> = self
            .http
            .fetch_all_pages(&with_query("/ec2/subnets", &[("VpcId", vpc_id)]))
            .await?;
        // The gateway filter is advisory; keep only what belongs to the VPC
        Ok(subnets
            .into_iter()
            .filter(|s| s.vpc_id == vpc_id && s.state == NetworkResourceState::Available)
            .collect())
    }

    async fn list_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroup>, CloudError> {
        let groups: Vec<SecurityGroup> = self
            .http
            .fetch_all_pages(&with_query("/ec2/security-groups", &[("VpcId", vpc_id)]))
            .await?;
        Ok(groups.into_iter().filter(|g| g.vpc_id == vpc_id).collect())
    }
}
