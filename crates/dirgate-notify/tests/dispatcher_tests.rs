//! Dispatcher behaviour: rendering, masking, and one audit row per attempt.

use std::sync::Arc;

use dirgate_db::models::{NewNotificationTemplate, NotificationLog, NotificationStatus, NotificationTemplate};
use dirgate_db::{run_migrations, DbPool};
use dirgate_notify::{
    KavenegarProvider, MockSmsProvider, NotificationDispatcher, ProviderSettings, SecretNotice,
    SmsProviderKind,
};
use dirgate_secrets::SecretValue;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_pool() -> DbPool {
    let pool = DbPool::in_memory().await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

fn notice(secret: &SecretValue) -> SecretNotice<'_> {
    SecretNotice {
        recipient: "09121234567",
        username: "alice",
        full_name: "Alice Smith",
        secret,
    }
}

#[tokio::test]
async fn test_successful_dispatch_logs_masked_message() {
    let pool = test_pool().await;
    let provider = Arc::new(MockSmsProvider::new());
    let dispatcher = NotificationDispatcher::new(provider.clone(), pool.clone());
    let secret = SecretValue::new("Xk9#mQ2!vB");

    let dispatch = dispatcher.send_secret(&notice(&secret)).await.unwrap();
    assert!(dispatch.report.success);
    assert_eq!(dispatch.log.status, "sent");
    assert_eq!(dispatch.log.provider, "mock");
    assert!(!dispatch.log.message.contains("Xk9#mQ2!vB"));
    assert!(dispatch.log.message.contains("********"));

    let sent = provider.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("Xk9#mQ2!vB"));
}

#[tokio::test]
async fn test_active_template_is_used() {
    let pool = test_pool().await;
    let template = NotificationTemplate::upsert(
        pool.inner(),
        &NewNotificationTemplate {
            name: "credentials".to_string(),
            body: "{{full_name}}: {{username}} / {{password}}".to_string(),
            variables: vec!["full_name".into(), "username".into(), "password".into()],
            is_active: Some(true),
        },
    )
    .await
    .unwrap();

    let provider = Arc::new(MockSmsProvider::new());
    let dispatcher = NotificationDispatcher::new(provider.clone(), pool.clone());
    let secret = SecretValue::new("pw-1");
    let dispatch = dispatcher.send_secret(&notice(&secret)).await.unwrap();

    assert_eq!(provider.sent().await[0].body, "Alice Smith: alice / pw-1");
    assert_eq!(dispatch.log.message, "Alice Smith: alice / ********");
    assert_eq!(dispatch.log.template_id, Some(template.id));
}

#[tokio::test]
async fn test_failed_dispatch_still_logged() {
    let pool = test_pool().await;
    let provider = Arc::new(MockSmsProvider::new());
    provider.fail_with(Some("Insufficient credit")).await;
    let dispatcher = NotificationDispatcher::new(provider, pool.clone());
    let secret = SecretValue::new("pw");

    let dispatch = dispatcher.send_secret(&notice(&secret)).await.unwrap();
    assert!(!dispatch.report.success);
    assert_eq!(dispatch.report.error.as_deref(), Some("Insufficient credit"));
    assert_eq!(dispatch.log.status, "failed");
    assert_eq!(dispatch.log.error.as_deref(), Some("Insufficient credit"));
    assert_eq!(
        NotificationLog::count_by_status(pool.inner(), NotificationStatus::Failed).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_broken_template_is_a_failed_attempt() {
    let pool = test_pool().await;
    NotificationTemplate::upsert(
        pool.inner(),
        &NewNotificationTemplate {
            name: "broken".to_string(),
            body: "Hi {{nickname}}".to_string(),
            variables: vec!["nickname".into()],
            is_active: Some(true),
        },
    )
    .await
    .unwrap();

    let provider = Arc::new(MockSmsProvider::new());
    let dispatcher = NotificationDispatcher::new(provider.clone(), pool.clone());
    let secret = SecretValue::new("pw");
    let dispatch = dispatcher.send_secret(&notice(&secret)).await.unwrap();

    assert!(!dispatch.report.success);
    assert_eq!(dispatch.log.status, "failed");
    assert_eq!(provider.send_count().await, 0);
}

#[tokio::test]
async fn test_empty_recipient_fails_without_sending() {
    let pool = test_pool().await;
    let provider = Arc::new(MockSmsProvider::new());
    let dispatcher = NotificationDispatcher::new(provider.clone(), pool.clone());

    let dispatch = dispatcher.send("  ", "hello").await.unwrap();
    assert!(!dispatch.report.success);
    assert_eq!(dispatch.log.status, "failed");
    assert_eq!(provider.send_count().await, 0);
}

#[tokio::test]
async fn test_raw_send_is_logged() {
    let pool = test_pool().await;
    let provider = Arc::new(MockSmsProvider::new());
    let dispatcher = NotificationDispatcher::new(provider.clone(), pool.clone());

    let dispatch = dispatcher.send("09121234567", "hello").await.unwrap();
    assert!(dispatch.report.success);
    assert_eq!(provider.send_count().await, 1);

    let logs = NotificationLog::list_recent(pool.inner(), 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].id, dispatch.log.id);
    assert_eq!(logs[0].recipient, "09121234567");
    assert_eq!(logs[0].message, "hello");
    assert_eq!(logs[0].status, "sent");
    assert!(logs[0].template_id.is_none());
}

#[tokio::test]
async fn test_provider_timeout_becomes_failed_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"return": {"status": 200}}))
                .set_delay(std::time::Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let settings = ProviderSettings::new(SmsProviderKind::Kavenegar, "KEY", "1000")
        .with_base_url(server.uri())
        .with_timeout(std::time::Duration::from_millis(100));
    let provider = Arc::new(KavenegarProvider::new(settings).unwrap());
    let pool = test_pool().await;
    let dispatcher = NotificationDispatcher::new(provider, pool.clone());

    let dispatch = dispatcher.send("09121234567", "hello").await.unwrap();
    assert!(!dispatch.report.success);
    assert!(dispatch.report.error.is_some());

    let logs = NotificationLog::list_recent(pool.inner(), 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "failed");
    assert_eq!(logs[0].error, dispatch.report.error);
}
