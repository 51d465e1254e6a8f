//! Test utilities for service layer testing

use promart_auth::{Account, Role};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    Row, SqlitePool,
};
use tempfile::TempDir;

/// Creates a test database with the real schema applied.
pub async fn create_test_db() -> (SqlitePool, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let connect_options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Memory)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(connect_options)
        .await
        .expect("Failed to create test database");

    promart_database::MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    (pool, temp_dir)
}

async fn insert_user(pool: &SqlitePool, email: &str, display_name: &str, role: &str) -> i64 {
    let now = chrono::Utc::now().to_rfc3339();
    let public_id = format!("test-{}", uuid::Uuid::new_v4());

    sqlx::query(
        r#"
        INSERT INTO users (public_id, email, phone, display_name, role, is_active, created_at, updated_at)
        VALUES (?, ?, '+15550100', ?, ?, TRUE, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(email)
    .bind(display_name)
    .bind(role)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .expect("Failed to insert test user");

    sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("Failed to fetch test user id")
}

pub async fn create_company(pool: &SqlitePool, email: &str, company_name: &str) -> i64 {
    insert_user(pool, email, company_name, "company").await
}

pub async fn create_admin(pool: &SqlitePool, email: &str) -> i64 {
    insert_user(pool, email, "Directory Admin", "admin").await
}

/// Load a full `Account` for a previously created test user.
pub async fn fetch_account(pool: &SqlitePool, user_id: i64) -> Account {
    let row = sqlx::query(
        "SELECT id, public_id, email, phone, display_name, role, is_active FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .expect("Failed to fetch test account");

    Account {
        id: row.get("id"),
        public_id: row.get("public_id"),
        email: row.get("email"),
        phone: row.get("phone"),
        display_name: row.get("display_name"),
        role: Role::from(row.get::<String, _>("role").as_str()),
        is_active: row.get("is_active"),
    }
}
