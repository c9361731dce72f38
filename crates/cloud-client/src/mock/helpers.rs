//! Helper functions for building provider identifiers and fixtures

use crate::models::*;
use chrono::Utc;
use std::collections::BTreeMap;

/// ARN builders and fixtures for mock implementations
#[derive(Debug, Clone)]
pub struct Helpers {
    account_id: String,
    region: String,
}

impl Helpers {
    pub fn new(account_id: String, region: String) -> Self {
        Self { account_id, region }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn role_arn(&self, role_name: &str) -> String {
        format!("arn:aws:iam::{}:role/{}", self.account_id, role_name)
    }

    pub fn policy_arn(&self, policy_name: &str) -> String {
        format!("arn:aws:iam::{}:policy/{}", self.account_id, policy_name)
    }

    pub fn function_arn(&self, function_name: &str) -> String {
        format!(
            "arn:aws:lambda:{}:{}:function:{}",
            self.region, self.account_id, function_name
        )
    }

    /// IAM-style unique id; distinct for every creation
    pub fn role_id(&self, id: u64) -> String {
        format!("AROA{:016X}", id)
    }

    /// An active, settled function (for test setup with `seed_function`)
    pub fn active_function(&self, function_name: &str, role_arn: &str, image_uri: &str) -> FunctionConfiguration {
        FunctionConfiguration {
            function_name: function_name.to_string(),
            function_arn: self.function_arn(function_name),
            role: role_arn.to_string(),
            image_uri: image_uri.to_string(),
            memory_size: 128,
            timeout: 30,
            state: FunctionState::Active,
            state_reason: None,
            last_update_status: Some(LastUpdateStatus::Successful),
            last_update_status_reason: None,
            vpc_config: None,
            environment: BTreeMap::new(),
            last_modified: Utc::now(),
        }
    }
}
