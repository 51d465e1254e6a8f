//! Notification persistence and the moderation fan-out.
//!
//! Fan-out runs strictly after the triggering state change has committed.
//! Every recipient is processed inside its own failure boundary: the store
//! insert and the email send fail independently, failures are logged and
//! tagged per recipient, and nothing here ever propagates an error to the
//! caller.

use promart_mailer::Mailer;
use sqlx::SqlitePool;
use tracing::warn;

use super::error::ServiceError;
use crate::routes::models::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    NewListing,
    StatusUpdate,
    ReApproval,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewListing => "new_listing",
            NotificationKind::StatusUpdate => "status_update",
            NotificationKind::ReApproval => "re_approval",
        }
    }
}

/// Per-recipient outcome of one fan-out attempt, tracked for observability
/// only. `Sent` means the durable notification record was written; email is a
/// best-effort side channel and its failures are only logged.
#[derive(Debug)]
pub enum Delivery {
    Sent { user_id: i64 },
    Failed { user_id: i64, reason: String },
}

pub async fn create_notification(
    pool: &SqlitePool,
    user_id: i64,
    kind: NotificationKind,
    message: &str,
    listing_id: Option<i64>,
) -> Result<i64, ServiceError> {
    let now = chrono::Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, type, message, listing_id, read, created_at)
        VALUES (?, ?, ?, ?, FALSE, ?)
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(message)
    .bind(listing_id)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn list_notifications(
    pool: &SqlitePool,
    user_id: i64,
    unread_only: bool,
    limit: i64,
    offset: i64,
) -> Result<Vec<Notification>, ServiceError> {
    let notifications = if unread_only {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, type, message, listing_id, read, created_at
            FROM notifications
            WHERE user_id = ? AND read = FALSE
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, type, message, listing_id, read, created_at
            FROM notifications
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
    };

    Ok(notifications)
}

pub async fn unread_count(pool: &SqlitePool, user_id: i64) -> Result<i64, ServiceError> {
    let count =
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = FALSE")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

pub async fn mark_read(
    pool: &SqlitePool,
    user_id: i64,
    notification_id: i64,
    read: bool,
) -> Result<Notification, ServiceError> {
    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM notifications WHERE id = ? AND user_id = ?")
            .bind(notification_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    if existing.is_none() {
        return Err(ServiceError::NotFound);
    }

    sqlx::query("UPDATE notifications SET read = ? WHERE id = ? AND user_id = ?")
        .bind(read)
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    let notification = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, type, message, listing_id, read, created_at
        FROM notifications
        WHERE id = ?
        "#,
    )
    .bind(notification_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ServiceError::internal("failed to fetch updated notification"))?;

    Ok(notification)
}

pub async fn mark_all_read(pool: &SqlitePool, user_id: i64) -> Result<u64, ServiceError> {
    let result =
        sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = ? AND read = FALSE")
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

/// Fan a listing event out to every admin account: one stored notification
/// and one best-effort email per admin. Returns the per-recipient outcomes;
/// never fails.
pub async fn notify_admins(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    kind: NotificationKind,
    message: &str,
    listing_id: Option<i64>,
    email_subject: &str,
    email_body: &str,
) -> Vec<Delivery> {
    let admins: Vec<(i64, String)> =
        match sqlx::query_as("SELECT id, email FROM users WHERE role = 'admin'")
            .fetch_all(pool)
            .await
        {
            Ok(rows) => rows,
            Err(error) => {
                warn!(%error, kind = kind.as_str(), "failed to load admin recipients, skipping fan-out");
                return Vec::new();
            }
        };

    let mut deliveries = Vec::with_capacity(admins.len());
    for (user_id, email) in admins {
        deliveries.push(
            deliver(
                pool,
                mailer,
                user_id,
                &email,
                kind,
                message,
                listing_id,
                email_subject,
                email_body,
            )
            .await,
        );
    }

    log_failures(kind, &deliveries);
    deliveries
}

/// Notify the account owning a listing about a moderation decision. The live
/// account email is preferred; the listing's snapshot email is the fallback
/// when the account row is gone.
#[allow(clippy::too_many_arguments)]
pub async fn notify_owner(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    owner_id: i64,
    snapshot_email: &str,
    kind: NotificationKind,
    message: &str,
    listing_id: Option<i64>,
    email_subject: &str,
    email_body: &str,
) -> Delivery {
    let live_email: Option<String> = sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
        .bind(owner_id)
        .fetch_optional(pool)
        .await
        .ok()
        .flatten();
    let email = live_email.unwrap_or_else(|| snapshot_email.to_string());

    let delivery = deliver(
        pool,
        mailer,
        owner_id,
        &email,
        kind,
        message,
        listing_id,
        email_subject,
        email_body,
    )
    .await;

    log_failures(kind, std::slice::from_ref(&delivery));
    delivery
}

#[allow(clippy::too_many_arguments)]
async fn deliver(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    user_id: i64,
    email: &str,
    kind: NotificationKind,
    message: &str,
    listing_id: Option<i64>,
    email_subject: &str,
    email_body: &str,
) -> Delivery {
    let stored = create_notification(pool, user_id, kind, message, listing_id).await;

    if let Err(error) = mailer.send(email, email_subject, email_body).await {
        warn!(recipient = %email, %error, kind = kind.as_str(), "notification email failed");
    }

    match stored {
        Ok(_) => Delivery::Sent { user_id },
        Err(error) => {
            warn!(user_id, ?error, kind = kind.as_str(), "notification store failed");
            Delivery::Failed {
                user_id,
                reason: format!("{error:?}"),
            }
        }
    }
}

fn log_failures(kind: NotificationKind, deliveries: &[Delivery]) {
    let failed = deliveries
        .iter()
        .filter(|d| matches!(d, Delivery::Failed { .. }))
        .count();
    if failed > 0 {
        warn!(
            kind = kind.as_str(),
            failed,
            total = deliveries.len(),
            "notification fan-out completed with failures"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::{create_admin, create_company, create_test_db};
    use promart_mailer::MemoryMailer;

    #[tokio::test]
    async fn create_and_list_notifications() {
        let (pool, _tmp) = create_test_db().await;
        let user_id = create_company(&pool, "co@example.com", "Acme").await;

        create_notification(
            &pool,
            user_id,
            NotificationKind::StatusUpdate,
            "Your listing was approved",
            None,
        )
        .await
        .unwrap();

        let notifications = list_notifications(&pool, user_id, false, 50, 0).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, "status_update");
        assert!(!notifications[0].read);
    }

    #[tokio::test]
    async fn unread_count_tracks_mark_read() {
        let (pool, _tmp) = create_test_db().await;
        let user_id = create_company(&pool, "co@example.com", "Acme").await;

        let id = create_notification(&pool, user_id, NotificationKind::NewListing, "msg", None)
            .await
            .unwrap();
        create_notification(&pool, user_id, NotificationKind::NewListing, "msg2", None)
            .await
            .unwrap();

        assert_eq!(unread_count(&pool, user_id).await.unwrap(), 2);

        let updated = mark_read(&pool, user_id, id, true).await.unwrap();
        assert!(updated.read);
        assert_eq!(unread_count(&pool, user_id).await.unwrap(), 1);

        assert_eq!(mark_all_read(&pool, user_id).await.unwrap(), 1);
        assert_eq!(unread_count(&pool, user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_read_requires_ownership() {
        let (pool, _tmp) = create_test_db().await;
        let owner = create_company(&pool, "owner@example.com", "Acme").await;
        let other = create_company(&pool, "other@example.com", "Other").await;

        let id = create_notification(&pool, owner, NotificationKind::NewListing, "msg", None)
            .await
            .unwrap();

        let result = mark_read(&pool, other, id, true).await;
        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn notify_admins_reaches_every_admin_account() {
        let (pool, _tmp) = create_test_db().await;
        create_admin(&pool, "a1@example.com").await;
        create_admin(&pool, "a2@example.com").await;
        create_company(&pool, "co@example.com", "Acme").await;

        let mailer = MemoryMailer::new();
        let deliveries = notify_admins(
            &pool,
            &mailer,
            NotificationKind::NewListing,
            "New listing submitted",
            None,
            "New listing",
            "A new listing awaits review",
        )
        .await;

        assert_eq!(deliveries.len(), 2);
        assert!(deliveries.iter().all(|d| matches!(d, Delivery::Sent { .. })));

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE type = 'new_listing'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 2);

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 2);
        let recipients: Vec<_> = sent.iter().map(|m| m.to.as_str()).collect();
        assert!(recipients.contains(&"a1@example.com"));
        assert!(recipients.contains(&"a2@example.com"));
    }

    #[tokio::test]
    async fn notify_owner_prefers_live_email() {
        let (pool, _tmp) = create_test_db().await;
        let owner = create_company(&pool, "current@example.com", "Acme").await;

        let mailer = MemoryMailer::new();
        let delivery = notify_owner(
            &pool,
            &mailer,
            owner,
            "stale@example.com",
            NotificationKind::StatusUpdate,
            "Approved",
            None,
            "Listing approved",
            "Your listing was approved",
        )
        .await;

        assert!(matches!(delivery, Delivery::Sent { .. }));
        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "current@example.com");
    }
}
