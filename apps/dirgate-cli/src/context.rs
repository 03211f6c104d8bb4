//! Wiring of configuration into the lifecycle manager.

use std::sync::Arc;

use anyhow::Context as _;
use chrono::Duration;
use tracing::{info, warn};

use dirgate_db::models::DirectoryServerConfig;
use dirgate_db::{run_migrations, DbPool};
use dirgate_directory::build_directory;
use dirgate_identity::IdentityLifecycleManager;
use dirgate_notify::{build_provider, NotificationDispatcher};
use dirgate_secrets::EnvelopeVault;

use crate::config::Config;
use crate::error::{CliError, CliResult};

/// Open the local store and bring its schema up to date.
pub async fn open_database(config: &Config) -> CliResult<DbPool> {
    let db = DbPool::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database at {}", config.database_url))?;
    run_migrations(&db).await?;
    Ok(db)
}

/// Everything a lifecycle command needs.
pub struct AppContext {
    pub db: DbPool,
    pub manager: IdentityLifecycleManager,
    pub dispatcher: Option<Arc<NotificationDispatcher>>,
}

impl AppContext {
    pub async fn init(mut config: Config) -> CliResult<Self> {
        let db = open_database(&config).await?;

        if let Some(profile) = DirectoryServerConfig::find_active(db.inner()).await? {
            info!(profile = %profile.name, host = %profile.host, "Using active directory profile");
            config.apply_server_config(&profile)?;
        }
        let directory = build_directory(&config.directory)?;

        let dispatcher = match &config.sms {
            Some(settings) => {
                let provider = build_provider(settings)?;
                Some(Arc::new(NotificationDispatcher::new(provider, db.clone())))
            }
            None => {
                warn!("SMS_PROVIDER not set; secrets will not be delivered by SMS");
                None
            }
        };

        let mut manager = IdentityLifecycleManager::new(directory, db.clone(), EnvelopeVault::from_env())
            .with_secret_ttl(Duration::days(config.secret_expiry_days));
        if let Some(dispatcher) = &dispatcher {
            manager = manager.with_dispatcher(dispatcher.clone());
        }

        Ok(Self {
            db,
            manager,
            dispatcher,
        })
    }

    /// The dispatcher, or an error naming the missing configuration.
    pub fn require_dispatcher(&self) -> CliResult<&NotificationDispatcher> {
        self.dispatcher
            .as_deref()
            .ok_or_else(|| CliError::Validation("SMS_PROVIDER is not configured".to_string()))
    }
}
