//! Blog posts for the marketing site. Admin-managed, publicly readable.

use sqlx::SqlitePool;
use uuid::Uuid;

use super::error::ServiceError;
use crate::routes::models::{BlogPostRow, CreateBlogPostRequest, UpdateBlogPostRequest};

const DEFAULT_AUTHOR: &str = "ProMart Editorial";

pub async fn create_post(
    pool: &SqlitePool,
    req: CreateBlogPostRequest,
) -> Result<BlogPostRow, ServiceError> {
    let title = req.title.trim();
    let body = req.body.trim();
    let category = req.category.trim();

    if title.is_empty() {
        return Err(ServiceError::bad_request("title is required"));
    }
    if body.is_empty() {
        return Err(ServiceError::bad_request("body is required"));
    }
    if category.is_empty() {
        return Err(ServiceError::bad_request("category is required"));
    }

    let author = req
        .author
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(DEFAULT_AUTHOR);

    let now = chrono::Utc::now().to_rfc3339();
    let public_id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO blog_posts (public_id, title, body, category, author, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(title)
    .bind(body)
    .bind(category)
    .bind(author)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get_post(pool, &public_id).await
}

pub async fn update_post(
    pool: &SqlitePool,
    public_id: &str,
    req: UpdateBlogPostRequest,
) -> Result<BlogPostRow, ServiceError> {
    let now = chrono::Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE blog_posts
        SET title = COALESCE(?, title),
            body = COALESCE(?, body),
            category = COALESCE(?, category),
            author = COALESCE(?, author),
            updated_at = ?
        WHERE public_id = ?
        "#,
    )
    .bind(normalized(req.title))
    .bind(normalized(req.body))
    .bind(normalized(req.category))
    .bind(normalized(req.author))
    .bind(&now)
    .bind(public_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    get_post(pool, public_id).await
}

pub async fn delete_post(pool: &SqlitePool, public_id: &str) -> Result<(), ServiceError> {
    let result = sqlx::query("DELETE FROM blog_posts WHERE public_id = ?")
        .bind(public_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    Ok(())
}

pub async fn list_posts(
    pool: &SqlitePool,
    category: Option<&str>,
) -> Result<Vec<BlogPostRow>, ServiceError> {
    let posts = if let Some(category) = category {
        sqlx::query_as::<_, BlogPostRow>(
            "SELECT * FROM blog_posts WHERE category = ? ORDER BY created_at DESC",
        )
        .bind(category)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, BlogPostRow>("SELECT * FROM blog_posts ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?
    };

    Ok(posts)
}

pub async fn get_post(pool: &SqlitePool, public_id: &str) -> Result<BlogPostRow, ServiceError> {
    sqlx::query_as::<_, BlogPostRow>("SELECT * FROM blog_posts WHERE public_id = ?")
        .bind(public_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ServiceError::NotFound)
}

fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
