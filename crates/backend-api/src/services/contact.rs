//! Contact-form messages. Plain CRUD with a new/read status; unrelated to the
//! listing workflow.

use sqlx::SqlitePool;

use super::error::ServiceError;
use crate::routes::models::{ContactMessage, CreateContactMessageRequest};

const VALID_STATUSES: &[&str] = &["new", "read"];

pub async fn create_message(
    pool: &SqlitePool,
    req: CreateContactMessageRequest,
) -> Result<ContactMessage, ServiceError> {
    let name = req.name.trim();
    let email = req.email.trim();
    let message = req.message.trim();

    if name.is_empty() {
        return Err(ServiceError::bad_request("name is required"));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ServiceError::bad_request("a valid email is required"));
    }
    if message.is_empty() {
        return Err(ServiceError::bad_request("message is required"));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let subject = req
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let id = sqlx::query(
        r#"
        INSERT INTO contact_messages (name, email, subject, message, status, created_at)
        VALUES (?, ?, ?, ?, 'new', ?)
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(subject)
    .bind(message)
    .bind(&now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    fetch_message(pool, id).await
}

pub async fn list_messages(
    pool: &SqlitePool,
    status: Option<&str>,
) -> Result<Vec<ContactMessage>, ServiceError> {
    if let Some(status) = status {
        if !VALID_STATUSES.contains(&status) {
            return Err(ServiceError::bad_request(format!(
                "invalid status filter '{status}'"
            )));
        }
    }

    let messages = if let Some(status) = status {
        sqlx::query_as::<_, ContactMessage>(
            "SELECT id, name, email, subject, message, status, created_at FROM contact_messages WHERE status = ? ORDER BY created_at DESC",
        )
        .bind(status)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, ContactMessage>(
            "SELECT id, name, email, subject, message, status, created_at FROM contact_messages ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?
    };

    Ok(messages)
}

pub async fn mark_message_read(
    pool: &SqlitePool,
    id: i64,
) -> Result<ContactMessage, ServiceError> {
    let result = sqlx::query("UPDATE contact_messages SET status = 'read' WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    fetch_message(pool, id).await
}

pub async fn delete_message(pool: &SqlitePool, id: i64) -> Result<(), ServiceError> {
    let result = sqlx::query("DELETE FROM contact_messages WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    Ok(())
}

async fn fetch_message(pool: &SqlitePool, id: i64) -> Result<ContactMessage, ServiceError> {
    sqlx::query_as::<_, ContactMessage>(
        "SELECT id, name, email, subject, message, status, created_at FROM contact_messages WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(ServiceError::NotFound)
}
