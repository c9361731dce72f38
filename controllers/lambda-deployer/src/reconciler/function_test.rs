//! Unit tests for function convergence

#[cfg(test)]
mod tests {
    use crate::error::{DeployError, ErrorKind};
    use crate::reconciler::function::{lifecycle_of, BUCKET_ENV_VAR};
    use crate::reconciler::{Reconciler, RoleState};
    use crate::test_utils::*;
    use cloud_client::{
        CloudClientTrait, CreateFunctionRequest, FunctionState, LastUpdateStatus, MockCloudClient,
    };
    use deploy_spec::LifecycleState;
    use std::collections::BTreeMap;

    async fn setup(mock: &MockCloudClient) -> (Reconciler, RoleState) {
        let reconciler = create_test_reconciler(mock);
        let spec = create_test_spec();
        let mut ctx = create_test_context(&spec);
        let role = reconciler.reconcile_role(&spec, &mut ctx).await.unwrap();
        mock.clear_calls();
        (reconciler, role)
    }

    fn bucket_environment() -> BTreeMap<String, String> {
        BTreeMap::from([(BUCKET_ENV_VAR.to_string(), TEST_BUCKET.to_string())])
    }

    #[test]
    fn test_lifecycle_of() {
        let mock = MockCloudClient::default();
        let mut function = create_test_function(&mock, "f1", "arn:aws:iam::123456789012:role/r");
        assert_eq!(lifecycle_of(&function), LifecycleState::Active);

        function.last_update_status = Some(LastUpdateStatus::InProgress);
        assert_eq!(lifecycle_of(&function), LifecycleState::Updating);

        function.state = FunctionState::Pending;
        assert_eq!(lifecycle_of(&function), LifecycleState::Creating);

        function.state = FunctionState::Failed;
        assert_eq!(lifecycle_of(&function), LifecycleState::Failed);

        function.state = FunctionState::Active;
        function.last_update_status = Some(LastUpdateStatus::Failed);
        assert_eq!(lifecycle_of(&function), LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_create_function_and_wait_until_active() {
        let mock = create_test_account();
        mock.set_function_settle_polls(2);
        let (reconciler, role) = setup(&mock).await;
        let spec = create_test_spec();
        let mut ctx = create_test_context(&spec);

        let function = reconciler.converge_function(&spec, &role, &mut ctx).await.unwrap();

        assert_eq!(function.state, FunctionState::Active);
        assert_eq!(function.role, role.arn);
        assert_eq!(function.image_uri, TEST_IMAGE);
        assert_eq!(function.environment, bucket_environment());
        assert_eq!(ctx.result.state, LifecycleState::Active);
        assert_eq!(ctx.result.function_arn.as_deref(), Some(function.function_arn.as_str()));
        assert_eq!(mock.mutating_calls(), vec!["create_function f1".to_string()]);
        assert_eq!(mock.call_count("get_function"), 3);
    }

    #[tokio::test]
    async fn test_converged_function_left_alone() {
        let mock = create_test_account();
        let (reconciler, role) = setup(&mock).await;
        let spec = create_test_spec();
        let mut ctx = create_test_context(&spec);
        reconciler.converge_function(&spec, &role, &mut ctx).await.unwrap();
        mock.clear_calls();

        let mut ctx = create_test_context(&spec);
        reconciler.converge_function(&spec, &role, &mut ctx).await.unwrap();

        assert!(mock.mutating_calls().is_empty());
        assert!(!ctx.mutated);
        assert_eq!(ctx.result.state, LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_new_image_updates_code_only() {
        let mock = create_test_account();
        let (reconciler, role) = setup(&mock).await;
        let mut seeded = create_test_function(&mock, "f1", &role.arn);
        seeded.environment = bucket_environment();
        seeded.image_uri = "acct.dkr.ecr.region.amazonaws.com/repo:old".to_string();
        mock.seed_function(seeded);

        let spec = create_test_spec();
        let mut ctx = create_test_context(&spec);
        let function = reconciler.converge_function(&spec, &role, &mut ctx).await.unwrap();

        assert_eq!(function.image_uri, TEST_IMAGE);
        assert_eq!(mock.mutating_calls(), vec!["update_function_code f1".to_string()]);
        assert_eq!(ctx.result.state, LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_configuration_drift_merges_environment() {
        let mock = create_test_account();
        let (reconciler, role) = setup(&mock).await;
        let mut seeded = create_test_function(&mock, "f1", &role.arn);
        seeded.environment = BTreeMap::from([("LOG_LEVEL".to_string(), "debug".to_string())]);
        mock.seed_function(seeded);

        let spec = create_test_spec().with_memory_size(512).with_timeout(60);
        let mut ctx = create_test_context(&spec);
        let function = reconciler.converge_function(&spec, &role, &mut ctx).await.unwrap();

        assert_eq!(function.memory_size, 512);
        assert_eq!(function.timeout, 60);
        assert_eq!(function.environment.get("LOG_LEVEL").map(String::as_str), Some("debug"));
        assert_eq!(function.environment.get(BUCKET_ENV_VAR).map(String::as_str), Some(TEST_BUCKET));
        assert_eq!(mock.mutating_calls(), vec!["update_function_configuration f1".to_string()]);
    }

    #[tokio::test]
    async fn test_role_change_is_configuration_drift() {
        let mock = create_test_account();
        let (reconciler, role) = setup(&mock).await;
        let old_role = seed_role(&mock, "legacy-role").await;
        let mut seeded = create_test_function(&mock, "f1", &old_role.arn);
        seeded.environment = bucket_environment();
        mock.seed_function(seeded);
        mock.clear_calls();

        let spec = create_test_spec();
        let mut ctx = create_test_context(&spec);
        let function = reconciler.converge_function(&spec, &role, &mut ctx).await.unwrap();

        assert_eq!(function.role, role.arn);
        assert_eq!(mock.mutating_calls(), vec!["update_function_configuration f1".to_string()]);
    }

    #[tokio::test]
    async fn test_transitioning_function_waited_on_first() {
        let mock = create_test_account();
        let (reconciler, role) = setup(&mock).await;
        mock.set_function_settle_polls(2);
        mock.create_function(&CreateFunctionRequest {
            function_name: "f1".to_string(),
            role: role.arn.clone(),
            image_uri: TEST_IMAGE.to_string(),
            memory_size: 128,
            timeout: 30,
            environment: bucket_environment(),
            vpc_config: None,
        })
        .await
        .unwrap();
        mock.clear_calls();

        let spec = create_test_spec();
        let mut ctx = create_test_context(&spec);
        let function = reconciler.converge_function(&spec, &role, &mut ctx).await.unwrap();

        assert_eq!(function.state, FunctionState::Active);
        assert_eq!(mock.call_count("get_function"), 2);
        assert!(mock.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_is_conflict_with_reason() {
        let mock = create_test_account();
        let (reconciler, role) = setup(&mock).await;
        let mut seeded = create_test_function(&mock, "f1", &role.arn);
        seeded.environment = bucket_environment();
        mock.seed_function(seeded);
        mock.fail_next_function_update("f1", "Memory quota exceeded for account");

        let spec = create_test_spec().with_memory_size(1024);
        let mut ctx = create_test_context(&spec);
        let err = reconciler.converge_function(&spec, &role, &mut ctx).await.unwrap_err();

        match err {
            DeployError::Conflict { message, .. } => assert!(message.contains("Memory quota")),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(ctx.result.state, LifecycleState::Failed);
        assert!(ctx.mutated);
        assert_eq!(mock.function("f1").unwrap().memory_size, 128);
    }

    #[tokio::test]
    async fn test_failed_function_without_drift_is_conflict() {
        let mock = create_test_account();
        let (reconciler, role) = setup(&mock).await;
        let mut seeded = create_test_function(&mock, "f1", &role.arn);
        seeded.environment = bucket_environment();
        seeded.state = FunctionState::Failed;
        seeded.state_reason = Some("Image manifest not found".to_string());
        mock.seed_function(seeded);

        let spec = create_test_spec();
        let mut ctx = create_test_context(&spec);
        let err = reconciler.converge_function(&spec, &role, &mut ctx).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("Image manifest not found"));
        assert_eq!(ctx.result.state, LifecycleState::Failed);
        assert!(mock.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_function_warns() {
        let mock = create_test_account();
        let (reconciler, role) = setup(&mock).await;
        let mut seeded = create_test_function(&mock, "f1", &role.arn);
        seeded.environment = bucket_environment();
        seeded.state = FunctionState::Inactive;
        mock.seed_function(seeded);

        let spec = create_test_spec();
        let mut ctx = create_test_context(&spec);
        reconciler.converge_function(&spec, &role, &mut ctx).await.unwrap();

        assert_eq!(ctx.result.warnings.len(), 1);
        assert!(ctx.result.warnings[0].contains("inactive"));
        assert_eq!(ctx.result.state, LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_function_settle_timeout() {
        let mock = create_test_account();
        let (reconciler, role) = setup(&mock).await;
        mock.set_function_settle_polls(1_000);

        let spec = create_test_spec();
        let mut ctx = create_test_context(&spec);
        let err = reconciler.converge_function(&spec, &role, &mut ctx).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(ctx.result.state, LifecycleState::Creating);
        assert!(ctx.result.function_arn.is_some());
    }
}
