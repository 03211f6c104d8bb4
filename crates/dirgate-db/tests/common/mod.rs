//! Integration test helpers for dirgate-db.

use std::sync::Once;

use dirgate_db::models::{DirectoryUser, UpsertDirectoryUser};
use dirgate_db::{run_migrations, DbPool};

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// Migrated in-memory database.
pub async fn test_pool() -> DbPool {
    init_test_logging();
    let pool = DbPool::in_memory().await.expect("open in-memory database");
    run_migrations(&pool).await.expect("run migrations");
    pool
}

pub async fn create_test_user(pool: &DbPool, uid: &str) -> DirectoryUser {
    DirectoryUser::upsert(
        pool.inner(),
        &UpsertDirectoryUser {
            uid: uid.to_string(),
            cn: format!("{uid} Test"),
            sn: "Test".to_string(),
            given_name: uid.to_string(),
            mail: format!("{uid}@example.com"),
            mobile: Some("09120000000".to_string()),
            synced_at: None,
        },
    )
    .await
    .expect("create test user")
}
