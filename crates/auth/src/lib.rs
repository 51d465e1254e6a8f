use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use cuid2::CuidConstructor;
use once_cell::sync::Lazy;
use promart_config::AuthConfig;
use rand::RngCore;
use serde::Serialize;
use sqlx::{Row, SqlitePool, Transaction};
use thiserror::Error;
use tracing::info;

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    session_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("account already exists")]
    AccountExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("account not found")]
    AccountNotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
}

/// Role attached to an account. Immutable after creation; there is no
/// role-change operation anywhere in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Company,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Company => "company",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::Company,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    pub email: String,
    pub phone: Option<String>,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: AuthConfig) -> Self {
        let session_ttl = Duration::seconds(config.session_ttl_seconds as i64);
        Self { pool, session_ttl }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Register a new company account with password credentials.
    pub async fn register_company(
        &self,
        email: &str,
        phone: Option<&str>,
        company_name: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_some() {
            return Err(AuthError::AccountExists);
        }

        let password_hash = self.hash_password(password)?;
        let account = self
            .insert_account(&mut tx, email, phone, company_name, Role::Company)
            .await?;
        self.insert_password_identity(&mut tx, account.id, email, &password_hash)
            .await?;

        tx.commit().await?;

        info!(account = %account.public_id, "registered company account");
        Ok(account)
    }

    /// Create the administrator account when it does not exist yet. Called at
    /// startup; returns the existing account unchanged on subsequent runs.
    pub async fn ensure_admin(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Account, AuthError> {
        if let Some(row) = sqlx::query("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
        {
            let user_id: i64 = row.try_get("id")?;
            return self.fetch_account(user_id).await;
        }

        let mut tx = self.pool.begin().await?;
        let password_hash = self.hash_password(password)?;
        let account = self
            .insert_account(&mut tx, email, None, display_name, Role::Admin)
            .await?;
        self.insert_password_identity(&mut tx, account.id, email, &password_hash)
            .await?;
        tx.commit().await?;

        info!(account = %account.public_id, "created bootstrap admin account");
        Ok(account)
    }

    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let identity = sqlx::query(
            "SELECT user_id, secret FROM user_identities WHERE provider = 'password' AND provider_uid = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = identity else {
            return Err(AuthError::InvalidCredentials);
        };

        let secret: String = row.try_get("secret")?;
        let stored_hash = PasswordHash::new(&secret)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &stored_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let user_id: i64 = row.try_get("user_id")?;
        let account = self.fetch_account(user_id).await?;
        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&now)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        self.issue_session(user_id).await
    }

    pub async fn authenticate_token(
        &self,
        token: &str,
    ) -> Result<(Account, AuthSession), AuthError> {
        let row = sqlx::query("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::SessionNotFound);
        };

        let user_id: i64 = row.try_get("user_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(AuthError::SessionExpired);
        }

        let account = self.fetch_account(user_id).await?;
        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let session = AuthSession {
            token: token.to_owned(),
            user_id,
            expires_at,
        };

        Ok((account, session))
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let row = sqlx::query(
            "SELECT secret FROM user_identities WHERE provider = 'password' AND user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(AuthError::InvalidCredentials);
        };

        let secret: String = row.try_get("secret")?;
        let stored_hash = PasswordHash::new(&secret)?;
        Argon2::default()
            .verify_password(current_password.as_bytes(), &stored_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let new_hash = self.hash_password(new_password)?;
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE user_identities SET secret = ?, updated_at = ? WHERE provider = 'password' AND user_id = ?",
        )
        .bind(new_hash)
        .bind(&now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Re-fetch the live account record.
    pub async fn user_profile(&self, user_id: i64) -> Result<Account, AuthError> {
        self.fetch_account(user_id).await
    }

    async fn insert_account(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        email: &str,
        phone: Option<&str>,
        display_name: &str,
        role: Role,
    ) -> Result<Account, AuthError> {
        let now = Utc::now().to_rfc3339();
        let public_id = new_public_id();

        sqlx::query(
            "INSERT INTO users (public_id, email, phone, display_name, role, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, TRUE, ?, ?)",
        )
        .bind(&public_id)
        .bind(email)
        .bind(phone)
        .bind(display_name)
        .bind(role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;

        let row = sqlx::query("SELECT id FROM users WHERE public_id = ?")
            .bind(&public_id)
            .fetch_one(&mut **tx)
            .await?;

        Ok(Account {
            id: row.try_get("id")?,
            public_id,
            email: email.to_owned(),
            phone: phone.map(str::to_owned),
            display_name: display_name.to_owned(),
            role,
            is_active: true,
        })
    }

    async fn insert_password_identity(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        user_id: i64,
        email: &str,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO user_identities (user_id, provider, provider_uid, secret, created_at, updated_at) VALUES (?, 'password', ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(email)
        .bind(password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn fetch_account(&self, id: i64) -> Result<Account, AuthError> {
        let row = sqlx::query(
            "SELECT id, public_id, email, phone, display_name, role, is_active FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(AuthError::AccountNotFound);
        };

        Ok(Account {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            display_name: row.try_get("display_name")?,
            role: Role::from(row.try_get::<String, _>("role")?.as_str()),
            is_active: row.try_get("is_active")?,
        })
    }

    async fn issue_session(&self, user_id: i64) -> Result<AuthSession, AuthError> {
        let token = self.generate_session_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        sqlx::query(
            "INSERT INTO sessions (user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&token)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AuthSession {
            token,
            user_id,
            expires_at,
        })
    }

    fn hash_password(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    fn generate_session_token(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

fn new_public_id() -> String {
    CUID.create_id()
}
