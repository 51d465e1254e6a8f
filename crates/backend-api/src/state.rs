use std::sync::Arc;

use promart_auth::{Account, AuthSession, Authenticator};
use promart_config::UploadsConfig;
use promart_mailer::Mailer;
use sqlx::SqlitePool;

use crate::ApiError;

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    authenticator: Authenticator,
    mailer: Arc<dyn Mailer>,
    uploads: UploadsConfig,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        authenticator: Authenticator,
        mailer: Arc<dyn Mailer>,
        uploads: UploadsConfig,
    ) -> Self {
        Self {
            pool,
            authenticator,
            mailer,
            uploads,
        }
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub fn uploads(&self) -> &UploadsConfig {
        &self.uploads
    }

    pub async fn authenticate(&self, token: &str) -> Result<(Account, AuthSession), ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }
}
