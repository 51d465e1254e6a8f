//! Company-account administration and profile updates.
//!
//! Registration, login, and sessions live in `promart-auth`; this module
//! covers the admin-facing account surface and self-service profile edits.

use sqlx::SqlitePool;

use super::error::ServiceError;
use crate::routes::models::CompanyRow;

const COMPANY_COLUMNS: &str = "u.public_id, u.email, u.phone, u.display_name, u.is_active, u.created_at, \
     (SELECT COUNT(*) FROM listings l WHERE l.owner_id = u.id) AS listing_count";

pub async fn list_companies(pool: &SqlitePool) -> Result<Vec<CompanyRow>, ServiceError> {
    let companies = sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM users u WHERE u.role = 'company' ORDER BY u.created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(companies)
}

pub async fn fetch_company(pool: &SqlitePool, public_id: &str) -> Result<CompanyRow, ServiceError> {
    let company = sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM users u WHERE u.public_id = ? AND u.role = 'company'"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ServiceError::NotFound)?;
    Ok(company)
}

/// Toggle a company account. Disabled accounts fail authentication on their
/// next request; existing listings stay visible.
pub async fn set_company_active(
    pool: &SqlitePool,
    public_id: &str,
    is_active: bool,
) -> Result<CompanyRow, ServiceError> {
    let now = chrono::Utc::now().to_rfc3339();

    let result = sqlx::query(
        "UPDATE users SET is_active = ?, updated_at = ? WHERE public_id = ? AND role = 'company'",
    )
    .bind(is_active)
    .bind(&now)
    .bind(public_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    fetch_company(pool, public_id).await
}

/// Remove a company account. Sessions, identities, listings, and
/// notifications cascade at the schema level.
pub async fn delete_company(pool: &SqlitePool, public_id: &str) -> Result<(), ServiceError> {
    let result = sqlx::query("DELETE FROM users WHERE public_id = ? AND role = 'company'")
        .bind(public_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    Ok(())
}

/// Self-service profile update. Listing snapshots are deliberately not
/// re-synced; they record the contact details at submission time.
pub async fn update_profile(
    pool: &SqlitePool,
    user_id: i64,
    company_name: Option<String>,
    phone: Option<String>,
) -> Result<(), ServiceError> {
    let company_name = company_name
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let phone = phone.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if company_name.is_none() && phone.is_none() {
        return Ok(());
    }

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        UPDATE users
        SET display_name = COALESCE(?, display_name),
            phone = COALESCE(?, phone),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(company_name)
    .bind(phone)
    .bind(&now)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}
