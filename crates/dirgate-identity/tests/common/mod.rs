//! Shared harness: in-memory directory, in-memory SQLite, mock SMS provider.

use std::sync::{Arc, Once};

use dirgate_db::{run_migrations, DbPool};
use dirgate_directory::InMemoryDirectory;
use dirgate_identity::{AdminId, CreateUserRequest, IdentityLifecycleManager};
use dirgate_notify::{MockSmsProvider, NotificationDispatcher};
use dirgate_secrets::{EnvelopeVault, KdfParams};

pub const BASE_DN: &str = "dc=example,dc=com";

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

pub struct TestHarness {
    pub manager: IdentityLifecycleManager,
    pub directory: Arc<InMemoryDirectory>,
    pub sms: Arc<MockSmsProvider>,
    pub pool: DbPool,
}

/// Cheap KDF so tests stay fast.
pub fn test_vault() -> EnvelopeVault {
    EnvelopeVault::new("test-master-secret").with_kdf(KdfParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_vault(test_vault()).await
    }

    pub async fn with_vault(vault: EnvelopeVault) -> Self {
        init_test_logging();
        let pool = DbPool::in_memory().await.expect("open in-memory database");
        run_migrations(&pool).await.expect("run migrations");

        let directory = Arc::new(InMemoryDirectory::new(BASE_DN));
        let sms = Arc::new(MockSmsProvider::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(sms.clone(), pool.clone()));
        let manager = IdentityLifecycleManager::new(directory.clone(), pool.clone(), vault)
            .with_dispatcher(dispatcher);

        Self {
            manager,
            directory,
            sms,
            pool,
        }
    }
}

pub fn admin() -> AdminId {
    AdminId::new("admin")
}

pub fn alice(send_sms: bool) -> CreateUserRequest {
    CreateUserRequest {
        uid: "alice".to_string(),
        cn: "Alice Smith".to_string(),
        sn: "Smith".to_string(),
        given_name: "Alice".to_string(),
        mail: "alice@x.com".to_string(),
        mobile: Some("09121234567".to_string()),
        groups: Vec::new(),
        send_sms,
        password: None,
    }
}
