//! Lambda operations for MockCloudClient
//!
//! Functions move through `Pending -> Active` after creation and
//! `InProgress -> Successful | Failed` after updates; each `get_function`
//! call counts as one poll towards settling.

use super::{lock, MockCloudClient};
use crate::error::CloudError;
use crate::models::*;
use chrono::Utc;

/// Advance a function one poll towards its settled state
fn advance(client: &MockCloudClient, function: &mut FunctionConfiguration) {
    let mut settling = lock(&client.function_settling);
    let Some(remaining) = settling.get_mut(&function.function_name) else {
        return;
    };
    if *remaining > 0 {
        *remaining -= 1;
    }
    if *remaining == 0 {
        settling.remove(&function.function_name);
        settle(client, function);
    }
}

fn settle(client: &MockCloudClient, function: &mut FunctionConfiguration) {
    if function.state == FunctionState::Pending {
        function.state = FunctionState::Active;
        function.state_reason = None;
    }
    if function.last_update_status == Some(LastUpdateStatus::InProgress) {
        match lock(&client.update_failures).remove(&function.function_name) {
            Some(reason) => {
                function.last_update_status = Some(LastUpdateStatus::Failed);
                function.last_update_status_reason = Some(reason);
            }
            None => {
                function.last_update_status = Some(LastUpdateStatus::Successful);
                function.last_update_status_reason = None;
            }
        }
    }
}

/// Put a freshly mutated function into its transitional state
fn begin_transition(client: &MockCloudClient, function: &mut FunctionConfiguration) {
    let polls = client.settings().function_settle_polls;
    if polls == 0 {
        settle(client, function);
    } else {
        lock(&client.function_settling).insert(function.function_name.clone(), polls);
    }
}

/// Fill in the VPC id from the first subnet, as the provider reports it
fn with_vpc_id(client: &MockCloudClient, vpc_config: &VpcConfig) -> VpcConfig {
    let vpc_id = vpc_config.vpc_id.clone().or_else(|| {
        let subnets = lock(&client.subnets);
        vpc_config
            .subnet_ids
            .iter()
            .find_map(|id| subnets.get(id).map(|s| s.vpc_id.clone()))
    });
    VpcConfig {
        vpc_id,
        ..vpc_config.clone()
    }
}

fn role_exists(client: &MockCloudClient, role_arn: &str) -> bool {
    lock(&client.roles).values().any(|r| r.arn == role_arn)
}

fn ensure_updatable(function: &FunctionConfiguration) -> Result<(), CloudError> {
    if function.is_transitioning() {
        return Err(CloudError::conflict(
            function.function_arn.clone(),
            "ResourceConflictException: An update is in progress for this function",
        ));
    }
    Ok(())
}

pub async fn get_function(client: &MockCloudClient, function_name: &str) -> Result<Option<FunctionConfiguration>, CloudError> {
    client.record("get_function", function_name)?;

    let mut functions = lock(&client.functions);
    let Some(function) = functions.get_mut(function_name) else {
        return Ok(None);
    };
    advance(client, function);
    Ok(Some(function.clone()))
}

pub async fn list_functions(client: &MockCloudClient) -> Result<Vec<FunctionConfiguration>, CloudError> {
    client.record("list_functions", "")?;
    let mut functions: Vec<FunctionConfiguration> = lock(&client.functions).values().cloned().collect();
    functions.sort_by(|a, b| a.function_name.cmp(&b.function_name));
    Ok(functions)
}

pub async fn create_function(client: &MockCloudClient, request: &CreateFunctionRequest) -> Result<FunctionConfiguration, CloudError> {
    client.record("create_function", &request.function_name)?;

    if !role_exists(client, &request.role) {
        return Err(CloudError::InvalidRequest(format!(
            "The role defined for the function cannot be assumed by Lambda: {}",
            request.role
        )));
    }

    let mut functions = lock(&client.functions);
    if functions.contains_key(&request.function_name) {
        return Err(CloudError::conflict(
            client.helpers.function_arn(&request.function_name),
            "ResourceConflictException: Function already exist",
        ));
    }

    let mut function = FunctionConfiguration {
        function_name: request.function_name.clone(),
        function_arn: client.helpers.function_arn(&request.function_name),
        role: request.role.clone(),
        image_uri: request.image_uri.clone(),
        memory_size: request.memory_size,
        timeout: request.timeout,
        state: FunctionState::Pending,
        state_reason: Some("The function is being created.".to_string()),
        last_update_status: None,
        last_update_status_reason: None,
        vpc_config: request.vpc_config.clone(),
        environment: request.environment.clone(),
        last_modified: Utc::now(),
    };
    begin_transition(client, &mut function);
    functions.insert(function.function_name.clone(), function.clone());
    Ok(function)
}

pub async fn update_function_code(client: &MockCloudClient, function_name: &str, image_uri: &str) -> Result<FunctionConfiguration, CloudError> {
    client.record("update_function_code", function_name)?;

    let mut functions = lock(&client.functions);
    let function = functions
        .get_mut(function_name)
        .ok_or_else(|| CloudError::NotFound(format!("Function not found: {}", function_name)))?;
    ensure_updatable(function)?;

    let failing = lock(&client.update_failures).contains_key(function_name);
    if !failing {
        function.image_uri = image_uri.to_string();
    }
    function.last_update_status = Some(LastUpdateStatus::InProgress);
    function.last_modified = Utc::now();
    begin_transition(client, function);
    Ok(function.clone())
}

pub async fn update_function_configuration(client: &MockCloudClient, function_name: &str, request: &UpdateFunctionConfigurationRequest) -> Result<FunctionConfiguration, CloudError> {
    client.record("update_function_configuration", function_name)?;

    if let Some(role) = &request.role {
        if !role_exists(client, role) {
            return Err(CloudError::InvalidRequest(format!(
                "The role defined for the function cannot be assumed by Lambda: {}",
                role
            )));
        }
    }

    let mut functions = lock(&client.functions);
    let function = functions
        .get_mut(function_name)
        .ok_or_else(|| CloudError::NotFound(format!("Function not found: {}", function_name)))?;
    ensure_updatable(function)?;

    // A failing update leaves the previous configuration in place
    let failing = lock(&client.update_failures).contains_key(function_name);
    if !failing {
        if let Some(role) = &request.role {
            function.role = role.clone();
        }
        if let Some(memory_size) = request.memory_size {
            function.memory_size = memory_size;
        }
        if let Some(timeout) = request.timeout {
            function.timeout = timeout;
        }
        if let Some(environment) = &request.environment {
            function.environment = environment.clone();
        }
        if let Some(vpc_config) = &request.vpc_config {
            function.vpc_config = if vpc_config.is_empty() {
                None
            } else {
                Some(with_vpc_id(client, vpc_config))
            };
        }
    }
    function.last_update_status = Some(LastUpdateStatus::InProgress);
    function.last_modified = Utc::now();
    begin_transition(client, function);
    Ok(function.clone())
}

pub async fn invoke_function(client: &MockCloudClient, function_name: &str, _payload: &serde_json::Value) -> Result<InvocationResponse, CloudError> {
    client.record("invoke_function", function_name)?;

    let state = lock(&client.functions)
        .get(function_name)
        .map(|f| f.state)
        .ok_or_else(|| CloudError::NotFound(format!("Function not found: {}", function_name)))?;
    if state != FunctionState::Active {
        return Err(CloudError::conflict(
            client.helpers.function_arn(function_name),
            format!("ResourceConflictException: function is {:?}", state),
        ));
    }

    Ok(lock(&client.invoke_responses)
        .get(function_name)
        .cloned()
        .unwrap_or_else(|| InvocationResponse {
            status_code: 200,
            function_error: None,
            payload: serde_json::json!({ "status": "ok" }),
        }))
}

#[cfg(test)]
mod tests {
    use super::super::MockCloudClient;
    use crate::cloud_trait::CloudClientTrait;
    use crate::models::*;

    async fn seeded() -> MockCloudClient {
        let mock = MockCloudClient::default();
        mock.create_role("r", &PolicyDocument::new(vec![]), "test").await.unwrap();
        mock
    }

    fn request(mock: &MockCloudClient) -> CreateFunctionRequest {
        CreateFunctionRequest {
            function_name: "f1".to_string(),
            role: mock.helpers().role_arn("r"),
            image_uri: "repo:tag".to_string(),
            memory_size: 128,
            timeout: 30,
            environment: Default::default(),
            vpc_config: None,
        }
    }

    #[tokio::test]
    async fn test_function_settles_after_polls() {
        let mock = seeded().await;
        mock.set_function_settle_polls(2);
        let created = mock.create_function(&request(&mock)).await.unwrap();
        assert_eq!(created.state, FunctionState::Pending);

        let first = mock.get_function("f1").await.unwrap().unwrap();
        assert_eq!(first.state, FunctionState::Pending);
        let second = mock.get_function("f1").await.unwrap().unwrap();
        assert_eq!(second.state, FunctionState::Active);
    }

    #[tokio::test]
    async fn test_update_rejected_while_in_progress() {
        let mock = seeded().await;
        mock.set_function_settle_polls(1);
        mock.create_function(&request(&mock)).await.unwrap();

        let err = mock.update_function_code("f1", "repo:v2").await.unwrap_err();
        assert!(matches!(err, crate::CloudError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous_configuration() {
        let mock = seeded().await;
        mock.create_function(&request(&mock)).await.unwrap();
        mock.fail_next_function_update("f1", "ENI limit reached");

        let update = UpdateFunctionConfigurationRequest {
            memory_size: Some(512),
            ..Default::default()
        };
        let updated = mock.update_function_configuration("f1", &update).await.unwrap();
        assert_eq!(updated.last_update_status, Some(LastUpdateStatus::Failed));
        assert_eq!(updated.memory_size, 128);
        assert_eq!(updated.last_update_status_reason.as_deref(), Some("ENI limit reached"));
    }
}
