//! Model behaviour against a migrated in-memory database.

mod common;

use chrono::{Duration, Utc};
use common::{create_test_user, test_pool};
use dirgate_db::models::{
    DirectoryGroup, DirectoryServerConfig, DirectoryUser, DirectoryUserChanges,
    DirectoryUserGroup, EncryptedPayload, NewDirectoryServerConfig, NewNotificationLog,
    NewNotificationTemplate, NewUserPassword, NotificationLog, NotificationStatus,
    NotificationTemplate, PasswordType, UpsertDirectoryGroup, UpsertDirectoryUser, UserPassword,
};
use dirgate_db::DbPool;

fn server(name: &str) -> NewDirectoryServerConfig {
    NewDirectoryServerConfig {
        name: name.to_string(),
        host: format!("{name}.example.com"),
        port: 389,
        use_ssl: false,
        base_dn: "dc=example,dc=com".to_string(),
        bind_dn: "uid=admin,cn=users,cn=accounts,dc=example,dc=com".to_string(),
        bind_password: Some("bind-secret".to_string()),
    }
}

#[tokio::test]
async fn test_activate_leaves_exactly_one_active() {
    let pool = test_pool().await;
    let a = DirectoryServerConfig::create(pool.inner(), &server("ipa1")).await.unwrap();
    let b = DirectoryServerConfig::create(pool.inner(), &server("ipa2")).await.unwrap();

    DirectoryServerConfig::activate(pool.inner(), a.id).await.unwrap().unwrap();
    DirectoryServerConfig::activate(pool.inner(), b.id).await.unwrap().unwrap();

    let active: Vec<_> = DirectoryServerConfig::list(pool.inner())
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.is_active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, b.id);

    // Unknown id changes nothing
    assert!(DirectoryServerConfig::activate(pool.inner(), 9999).await.unwrap().is_none());
    let still = DirectoryServerConfig::find_active(pool.inner()).await.unwrap().unwrap();
    assert_eq!(still.id, b.id);
}

#[tokio::test]
async fn test_record_test_result() {
    let pool = test_pool().await;
    let config = DirectoryServerConfig::create(pool.inner(), &server("ipa1")).await.unwrap();
    assert!(config.last_test_ok.is_none());

    let updated = DirectoryServerConfig::record_test_result(pool.inner(), config.id, false, "Invalid credentials")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.last_test_ok, Some(false));
    assert_eq!(updated.last_test_message.as_deref(), Some("Invalid credentials"));
    assert!(updated.last_tested_at.is_some());
}

#[tokio::test]
async fn test_server_config_debug_redacts_password() {
    let pool = test_pool().await;
    let config = DirectoryServerConfig::create(pool.inner(), &server("ipa1")).await.unwrap();
    let debug = format!("{config:?}");
    assert!(!debug.contains("bind-secret"));
}

#[tokio::test]
async fn test_user_upsert_keeps_values_on_empty_remote() {
    let pool = test_pool().await;
    create_test_user(&pool, "jdoe").await;

    let refreshed = DirectoryUser::upsert(
        pool.inner(),
        &UpsertDirectoryUser {
            uid: "jdoe".to_string(),
            cn: String::new(),
            mail: "john@example.com".to_string(),
            mobile: None,
            synced_at: Some(Utc::now()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(refreshed.cn, "jdoe Test");
    assert_eq!(refreshed.sn, "Test");
    assert_eq!(refreshed.mail, "john@example.com");
    assert_eq!(refreshed.mobile.as_deref(), Some("09120000000"));
    assert!(refreshed.last_synced_at.is_some());
    assert_eq!(DirectoryUser::count(pool.inner()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_local_upsert_does_not_stamp_sync_time() {
    let pool = test_pool().await;
    let created = create_test_user(&pool, "jdoe").await;
    assert!(created.last_synced_at.is_none());

    let synced_at = Utc::now();
    let synced = DirectoryUser::upsert(
        pool.inner(),
        &UpsertDirectoryUser {
            uid: "jdoe".to_string(),
            synced_at: Some(synced_at),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(
        synced.last_synced_at.map(|t| t.timestamp_millis()),
        Some(synced_at.timestamp_millis())
    );

    // A later local write keeps the previous sync time
    let local = DirectoryUser::upsert(
        pool.inner(),
        &UpsertDirectoryUser {
            uid: "jdoe".to_string(),
            mail: "new@example.com".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(local.mail, "new@example.com");
    assert_eq!(
        local.last_synced_at.map(|t| t.timestamp_millis()),
        Some(synced_at.timestamp_millis())
    );
}

#[tokio::test]
async fn test_user_ensure_and_update() {
    let pool = test_pool().await;
    let bare = DirectoryUser::ensure(pool.inner(), "ghost").await.unwrap();
    assert_eq!(bare.cn, "");
    assert_eq!(bare.full_name(), "ghost");

    let again = DirectoryUser::ensure(pool.inner(), "ghost").await.unwrap();
    assert_eq!(again.id, bare.id);

    let changes = DirectoryUserChanges {
        cn: Some("Ghost User".to_string()),
        ..Default::default()
    };
    let updated = DirectoryUser::update(pool.inner(), "ghost", &changes).await.unwrap().unwrap();
    assert_eq!(updated.full_name(), "Ghost User");
    assert!(DirectoryUser::update(pool.inner(), "nobody", &changes).await.unwrap().is_none());
}

#[tokio::test]
async fn test_membership_edge_is_unique() {
    let pool = test_pool().await;
    let user = create_test_user(&pool, "jdoe").await;
    let group = DirectoryGroup::upsert(
        pool.inner(),
        &UpsertDirectoryGroup {
            cn: "devs".to_string(),
            description: Some("Developers".to_string()),
            gid_number: None,
        },
    )
    .await
    .unwrap();

    DirectoryUserGroup::add(pool.inner(), user.id, group.id).await.unwrap();
    DirectoryUserGroup::add(pool.inner(), user.id, group.id).await.unwrap();
    assert_eq!(DirectoryUserGroup::count(pool.inner(), user.id, group.id).await.unwrap(), 1);
    assert_eq!(
        DirectoryUserGroup::group_cns_for_user(pool.inner(), user.id).await.unwrap(),
        vec!["devs".to_string()]
    );

    assert!(DirectoryUserGroup::remove(pool.inner(), user.id, group.id).await.unwrap());
    assert!(!DirectoryUserGroup::remove(pool.inner(), user.id, group.id).await.unwrap());
}

#[tokio::test]
async fn test_group_upsert_keeps_description() {
    let pool = test_pool().await;
    let data = UpsertDirectoryGroup {
        cn: "ops".to_string(),
        description: Some("Operations".to_string()),
        gid_number: Some(20001),
    };
    DirectoryGroup::upsert(pool.inner(), &data).await.unwrap();

    let refreshed = DirectoryGroup::upsert(
        pool.inner(),
        &UpsertDirectoryGroup {
            cn: "ops".to_string(),
            description: None,
            gid_number: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(refreshed.description.as_deref(), Some("Operations"));
    assert_eq!(refreshed.gid_number, Some(20001));
    assert_eq!(DirectoryGroup::count(pool.inner()).await.unwrap(), 1);
}

async fn issue(pool: &DbPool, user_id: i64, payload: Option<EncryptedPayload>) -> UserPassword {
    UserPassword::insert(
        pool.inner(),
        &NewUserPassword {
            user_id,
            password_type: PasswordType::Initial,
            payload,
            expires_at: Utc::now() + Duration::days(7),
            created_by: "admin".to_string(),
        },
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_issued_secret_lifecycle() {
    let pool = test_pool().await;
    let user = create_test_user(&pool, "jdoe").await;
    let payload = EncryptedPayload {
        ciphertext: "ct".to_string(),
        wrapped_dek: "wd".to_string(),
        kdf_salt: "salt".to_string(),
        kdf_params: "argon2id$m=19456,t=2,p=1".to_string(),
    };

    let record = issue(&pool, user.id, Some(payload.clone())).await;
    assert_eq!(record.kind(), Some(PasswordType::Initial));
    assert_eq!(record.payload(), Some(payload));
    assert!(!record.is_sent);
    assert!(!record.is_expired_at(Utc::now()));
    assert!(record.is_expired_at(record.expires_at));

    assert!(UserPassword::mark_sent(pool.inner(), record.id).await.unwrap());
    let sent = UserPassword::find_by_id(pool.inner(), record.id).await.unwrap().unwrap();
    assert!(sent.is_sent);
    assert!(sent.sent_at.is_some());

    assert_eq!(
        UserPassword::count_for_user(pool.inner(), user.id, PasswordType::Initial).await.unwrap(),
        1
    );
    assert_eq!(
        UserPassword::count_for_user(pool.inner(), user.id, PasswordType::Reset).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_issued_secret_without_payload() {
    let pool = test_pool().await;
    let user = create_test_user(&pool, "jdoe").await;
    let record = issue(&pool, user.id, None).await;
    assert!(record.payload().is_none());
    assert!(record.ciphertext.is_none());
}

#[tokio::test]
async fn test_deleting_user_cascades() {
    let pool = test_pool().await;
    let user = create_test_user(&pool, "jdoe").await;
    issue(&pool, user.id, None).await;

    assert!(DirectoryUser::delete_by_uid(pool.inner(), "jdoe").await.unwrap());
    assert!(UserPassword::list_for_user(pool.inner(), user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transaction_rollback_discards_rows() {
    let pool = test_pool().await;
    let mut tx = pool.begin().await.unwrap();
    DirectoryUser::ensure(&mut *tx, "temp").await.unwrap();
    tx.rollback().await.unwrap();

    assert!(DirectoryUser::find_by_uid(pool.inner(), "temp").await.unwrap().is_none());
}

#[tokio::test]
async fn test_active_template_lookup() {
    let pool = test_pool().await;
    assert!(NotificationTemplate::find_active(pool.inner()).await.unwrap().is_none());

    let template = NotificationTemplate::upsert(
        pool.inner(),
        &NewNotificationTemplate {
            name: "welcome".to_string(),
            body: "Hi {{full_name}}, user {{username}} pass {{password}}".to_string(),
            variables: vec!["full_name".into(), "username".into(), "password".into()],
            is_active: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(template.variables.0.len(), 3);

    let active = NotificationTemplate::find_active(pool.inner()).await.unwrap().unwrap();
    assert_eq!(active.id, template.id);

    NotificationTemplate::set_active(pool.inner(), template.id, false).await.unwrap();
    assert!(NotificationTemplate::find_active(pool.inner()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_notification_log_counts() {
    let pool = test_pool().await;
    for status in [NotificationStatus::Sent, NotificationStatus::Failed, NotificationStatus::Failed] {
        NotificationLog::insert(
            pool.inner(),
            &NewNotificationLog {
                recipient: "09120000000".to_string(),
                message: "pass ********".to_string(),
                template_id: None,
                provider: "mock".to_string(),
                status,
                message_id: None,
                error: None,
                cost: None,
            },
        )
        .await
        .unwrap();
    }

    assert_eq!(NotificationLog::count_by_status(pool.inner(), NotificationStatus::Sent).await.unwrap(), 1);
    assert_eq!(NotificationLog::count_by_status(pool.inner(), NotificationStatus::Failed).await.unwrap(), 2);

    let logs = NotificationLog::list_for_recipient(pool.inner(), "09120000000").await.unwrap();
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().filter(|l| l.status == "sent").all(|l| l.sent_at.is_some()));
    assert!(logs.iter().filter(|l| l.status == "failed").all(|l| l.sent_at.is_none()));
}

#[tokio::test]
async fn test_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("dirgate.db").display());

    let pool = DbPool::connect(&url).await.unwrap();
    dirgate_db::run_migrations(&pool).await.unwrap();
    DirectoryUser::ensure(pool.inner(), "persisted").await.unwrap();
    pool.close().await;

    let reopened = DbPool::connect(&url).await.unwrap();
    assert!(DirectoryUser::find_by_uid(reopened.inner(), "persisted").await.unwrap().is_some());
}
