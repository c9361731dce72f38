//! Unit tests for reconcile_helpers module

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn fast_policy(max_attempts: u32) -> WaitPolicy {
    WaitPolicy {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        deadline: Duration::from_secs(5),
        max_attempts,
    }
}

#[tokio::test]
async fn test_wait_until_returns_when_ready() {
    let polls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&polls);
    let value = wait_until(&fast_policy(10), None, "thing", || {
        let counter = Arc::clone(&counter);
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Ok::<_, DeployError>(if n >= 3 { Probe::Ready(n) } else { Probe::NotYet })
        }
    })
    .await
    .unwrap();

    assert_eq!(value, 3);
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_wait_until_times_out_after_attempt_cap() {
    let err = wait_until(&fast_policy(4), None, "never", || async { Ok::<_, DeployError>(Probe::<()>::NotYet) })
        .await
        .unwrap_err();

    match err {
        DeployError::Timeout { what, attempts, .. } => {
            assert_eq!(what, "never");
            assert_eq!(attempts, 4);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_wait_until_times_out_on_deadline() {
    let policy = WaitPolicy {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(5),
        deadline: Duration::from_millis(20),
        max_attempts: u32::MAX,
    };
    let err = wait_until(&policy, None, "slow", || async { Ok::<_, DeployError>(Probe::<()>::NotYet) })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Timeout);
}

#[tokio::test]
async fn test_unavailable_is_retried_then_becomes_timeout() {
    let err = wait_until(&fast_policy(3), None, "flaky", || async {
        Err::<Probe<()>, _>(DeployError::Unavailable("throttled".to_string()))
    })
    .await
    .unwrap_err();
    assert!(matches!(err, DeployError::Timeout { attempts: 3, .. }));
}

#[tokio::test]
async fn test_unavailable_then_ready_succeeds() {
    let polls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&polls);
    let result = wait_until(&fast_policy(5), None, "recovering", || {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DeployError::Unavailable("503".to_string()))
            } else {
                Ok(Probe::Ready(()))
            }
        }
    })
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_permission_denied_is_not_retried() {
    let polls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&polls);
    let err = wait_until(&fast_policy(10), None, "denied", || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<Probe<()>, _>(DeployError::PermissionDenied("iam:GetRole".to_string()))
        }
    })
    .await
    .unwrap_err();

    assert_eq!(err.kind(), crate::error::ErrorKind::PermissionDenied);
    assert_eq!(polls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_before_first_poll() {
    let (_tx, rx) = watch::channel(true);
    let err = wait_until(&fast_policy(10), Some(&rx), "cancelled", || async { Ok::<_, DeployError>(Probe::Ready(())) })
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Cancelled(_)));
}

#[tokio::test]
async fn test_cancel_interrupts_backoff_sleep() {
    let policy = WaitPolicy {
        initial_delay: Duration::from_secs(30),
        max_delay: Duration::from_secs(30),
        deadline: Duration::from_secs(60),
        max_attempts: 10,
    };
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _ = tx.send(true);
    });

    let started = std::time::Instant::now();
    let err = wait_until(&policy, Some(&rx), "long wait", || async { Ok::<_, DeployError>(Probe::<()>::NotYet) })
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Cancelled(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_trust_policy_targets_lambda() {
    let trust = lambda_trust_policy();
    let statement = &trust.statement[0];
    assert_eq!(statement.action, vec!["sts:AssumeRole".to_string()]);
    assert_eq!(
        statement.principal,
        Some(serde_json::json!({ "Service": "lambda.amazonaws.com" }))
    );
}

#[test]
fn test_execution_policy_is_logs_only() {
    let policy = execution_policy();
    assert_eq!(policy.statement.len(), 1);
    assert!(policy.statement[0].action.iter().all(|a| a.starts_with("logs:")));
}

#[test]
fn test_merge_keeps_unrelated_statements() {
    let unrelated = PolicyStatement {
        sid: Some("TeamQueueAccess".to_string()),
        effect: Effect::Allow,
        principal: None,
        action: vec!["sqs:SendMessage".to_string()],
        resource: vec!["arn:aws:sqs:us-east-1:123456789012:jobs".to_string()],
    };
    let existing = PolicyDocument::new(vec![unrelated.clone(), bucket_statement("old-bucket")]);

    let merged = merge_bucket_statement(Some(&existing), "data-bucket");

    assert_eq!(merged.statement.len(), 2);
    assert_eq!(merged.statement_by_sid("TeamQueueAccess"), Some(&unrelated));
    let ours = merged.statement_by_sid(BUCKET_ACCESS_SID).unwrap();
    assert_eq!(ours.resource, AccessGrant::bucket_resources("data-bucket"));
}

#[test]
fn test_merge_is_stable_when_already_granted() {
    let existing = merge_bucket_statement(None, "data-bucket");
    let merged = merge_bucket_statement(Some(&existing), "data-bucket");
    assert!(merged.is_equivalent(&existing));
}

#[test]
fn test_policy_names() {
    assert_eq!(execution_policy_name("f1-role"), "f1-role-execution");
    assert_eq!(access_policy_name("f1-role"), "f1-role-s3-access");
}
