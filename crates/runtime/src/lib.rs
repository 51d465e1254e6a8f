use std::sync::Arc;

use anyhow::{Context, Result};
use promart_auth::Authenticator;
use promart_config::AppConfig;
use promart_database::initialize_database;
use promart_mailer::{mailer_from_config, Mailer};
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
    pub mailer: Arc<dyn Mailer>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database).await?;

        let authenticator = Authenticator::new(db_pool.clone(), config.auth.clone());

        if let Some(admin) = &config.auth.bootstrap_admin {
            let account = authenticator
                .ensure_admin(&admin.email, &admin.password, &admin.display_name)
                .await
                .context("failed to ensure bootstrap admin account")?;
            info!(admin = %account.public_id, "bootstrap admin ready");
        }

        let mailer =
            mailer_from_config(&config.mail).context("failed to initialise mail backend")?;
        info!(backend = %config.mail.backend, "mail backend ready");

        Ok(Self {
            db_pool,
            authenticator,
            mailer,
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
