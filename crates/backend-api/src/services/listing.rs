//! The listing moderation workflow.
//!
//! State machine: submissions always enter `pending`; an admin moves a
//! listing to `approved` or `rejected`; any owner edit forces it back to
//! `pending`. Every transition fans out notifications after the state change
//! has committed — fan-out failures are logged per recipient and never roll
//! back or fail the operation.

use promart_auth::Account;
use promart_mailer::Mailer;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::error::ServiceError;
use super::files::IngestedFile;
use super::notification::{self, NotificationKind};
use crate::routes::models::{parse_file_list, FileMetadata, ListingRow, ListingWithOwnerRow};

pub const DEFAULT_REJECTION_REASON: &str = "Does not meet listing guidelines";

const VALID_STATUSES: &[&str] = &["pending", "approved", "rejected"];

/// Scalar listing fields as they arrive from a multipart form. Absent fields
/// keep their stored values on edit; blank strings are treated as absent.
#[derive(Debug, Default, Clone)]
pub struct ListingFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub features: Option<String>,
}

pub async fn submit_listing(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    owner: &Account,
    fields: ListingFields,
    attachments: Vec<IngestedFile>,
    verification_documents: Vec<IngestedFile>,
) -> Result<ListingRow, ServiceError> {
    let title = required_field(fields.title.as_deref(), "title")?;
    let description = required_field(fields.description.as_deref(), "description")?;
    let category = required_field(fields.category.as_deref(), "category")?;

    let now = chrono::Utc::now().to_rfc3339();
    let public_id = Uuid::new_v4().to_string();
    let features_json = features_column(fields.features.as_deref());
    let attachments_json = encode_files(attachments, &now)?;
    let verification_json = encode_files(verification_documents, &now)?;

    sqlx::query(
        r#"
        INSERT INTO listings (
            public_id, owner_id, owner_name, owner_email, owner_phone,
            title, description, category, location, website,
            features, attachments, verification_documents,
            status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(owner.id)
    .bind(&owner.display_name)
    .bind(&owner.email)
    .bind(&owner.phone)
    .bind(&title)
    .bind(&description)
    .bind(&category)
    .bind(normalized(fields.location))
    .bind(normalized(fields.website))
    .bind(&features_json)
    .bind(&attachments_json)
    .bind(&verification_json)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    let listing = fetch_by_public_id(pool, &public_id)
        .await?
        .ok_or_else(|| ServiceError::internal("failed to fetch created listing"))?;

    // Fan-out starts only once the listing row is durable.
    let message = format!(
        "New listing \"{}\" from {} awaits review",
        listing.title, owner.display_name
    );
    let body = format!(
        "{} submitted a new listing \"{}\" in {}. It is pending review.",
        owner.display_name, listing.title, listing.category
    );
    notification::notify_admins(
        pool,
        mailer,
        NotificationKind::NewListing,
        &message,
        Some(listing.id),
        "New listing pending review",
        &body,
    )
    .await;

    Ok(listing)
}

pub async fn approve_listing(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    public_id: &str,
) -> Result<ListingRow, ServiceError> {
    let existing = fetch_by_public_id(pool, public_id)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query("UPDATE listings SET status = 'approved', updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(existing.id)
        .execute(pool)
        .await?;

    let listing = fetch_by_id(pool, existing.id).await?;

    let message = format!("Your listing \"{}\" has been approved", listing.title);
    let body = format!(
        "Your listing \"{}\" has been approved and is now publicly visible.",
        listing.title
    );
    notification::notify_owner(
        pool,
        mailer,
        listing.owner_id,
        &listing.owner_email,
        NotificationKind::StatusUpdate,
        &message,
        Some(listing.id),
        "Listing approved",
        &body,
    )
    .await;

    Ok(listing)
}

pub async fn reject_listing(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    public_id: &str,
    reason: Option<String>,
) -> Result<ListingRow, ServiceError> {
    let existing = fetch_by_public_id(pool, public_id)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let now = chrono::Utc::now().to_rfc3339();

    // The stored comment is only touched when a reason was actually given;
    // the default text exists solely in the notification and email.
    if let Some(ref reason) = reason {
        sqlx::query(
            "UPDATE listings SET status = 'rejected', admin_comment = ?, updated_at = ? WHERE id = ?",
        )
        .bind(reason)
        .bind(&now)
        .bind(existing.id)
        .execute(pool)
        .await?;
    } else {
        sqlx::query("UPDATE listings SET status = 'rejected', updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(existing.id)
            .execute(pool)
            .await?;
    }

    let listing = fetch_by_id(pool, existing.id).await?;

    let effective_reason = reason.as_deref().unwrap_or(DEFAULT_REJECTION_REASON);
    let message = format!(
        "Your listing \"{}\" was rejected: {}",
        listing.title, effective_reason
    );
    let body = format!(
        "Your listing \"{}\" was rejected. Reason: {}",
        listing.title, effective_reason
    );
    notification::notify_owner(
        pool,
        mailer,
        listing.owner_id,
        &listing.owner_email,
        NotificationKind::StatusUpdate,
        &message,
        Some(listing.id),
        "Listing rejected",
        &body,
    )
    .await;

    Ok(listing)
}

#[allow(clippy::too_many_arguments)]
pub async fn edit_listing(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    public_id: &str,
    acting_owner: &Account,
    fields: ListingFields,
    new_attachments: Vec<IngestedFile>,
    new_verification_documents: Vec<IngestedFile>,
    existing_attachments: Option<String>,
    existing_verification_documents: Option<String>,
) -> Result<ListingRow, ServiceError> {
    let current = fetch_by_public_id(pool, public_id)
        .await?
        .ok_or(ServiceError::NotFound)?;

    if current.owner_id != acting_owner.id {
        return Err(ServiceError::Forbidden);
    }

    let now = chrono::Utc::now().to_rfc3339();

    let attachments_json = merged_files(
        existing_attachments.as_deref(),
        &current.attachments,
        new_attachments,
        &now,
    )?;
    let verification_json = merged_files(
        existing_verification_documents.as_deref(),
        &current.verification_documents,
        new_verification_documents,
        &now,
    )?;

    let features_update = fields
        .features
        .as_deref()
        .map(|raw| features_column(Some(raw)));

    sqlx::query(
        r#"
        UPDATE listings
        SET title = COALESCE(?, title),
            description = COALESCE(?, description),
            category = COALESCE(?, category),
            location = COALESCE(?, location),
            website = COALESCE(?, website),
            features = COALESCE(?, features),
            attachments = ?,
            verification_documents = ?,
            status = 'pending',
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(normalized(fields.title))
    .bind(normalized(fields.description))
    .bind(normalized(fields.category))
    .bind(normalized(fields.location))
    .bind(normalized(fields.website))
    .bind(features_update)
    .bind(&attachments_json)
    .bind(&verification_json)
    .bind(&now)
    .bind(current.id)
    .execute(pool)
    .await?;

    let listing = fetch_by_id(pool, current.id).await?;

    let message = format!(
        "Listing \"{}\" was updated by {} and needs re-approval",
        listing.title, acting_owner.display_name
    );
    let body = format!(
        "{} updated the listing \"{}\". The changes are pending re-review.",
        acting_owner.display_name, listing.title
    );
    notification::notify_admins(
        pool,
        mailer,
        NotificationKind::ReApproval,
        &message,
        Some(listing.id),
        "Listing updated, re-approval needed",
        &body,
    )
    .await;

    Ok(listing)
}

pub async fn delete_listing(pool: &SqlitePool, public_id: &str) -> Result<(), ServiceError> {
    let result = sqlx::query("DELETE FROM listings WHERE public_id = ?")
        .bind(public_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    Ok(())
}

pub async fn fetch_by_public_id(
    pool: &SqlitePool,
    public_id: &str,
) -> Result<Option<ListingRow>, ServiceError> {
    let listing = sqlx::query_as::<_, ListingRow>("SELECT * FROM listings WHERE public_id = ?")
        .bind(public_id)
        .fetch_optional(pool)
        .await?;
    Ok(listing)
}

async fn fetch_by_id(pool: &SqlitePool, id: i64) -> Result<ListingRow, ServiceError> {
    let listing = sqlx::query_as::<_, ListingRow>("SELECT * FROM listings WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ServiceError::internal("listing disappeared mid-operation"))?;
    Ok(listing)
}

/// Publicly visible listings with the owner's live contact details.
pub async fn list_approved(pool: &SqlitePool) -> Result<Vec<ListingWithOwnerRow>, ServiceError> {
    let listings = sqlx::query_as::<_, ListingWithOwnerRow>(
        r#"
        SELECT l.*, u.display_name AS live_name, u.email AS live_email, u.phone AS live_phone
        FROM listings l
        LEFT JOIN users u ON u.id = l.owner_id
        WHERE l.status = 'approved'
        ORDER BY l.created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(listings)
}

pub async fn list_mine(pool: &SqlitePool, owner_id: i64) -> Result<Vec<ListingRow>, ServiceError> {
    let listings = sqlx::query_as::<_, ListingRow>(
        "SELECT * FROM listings WHERE owner_id = ? ORDER BY created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(listings)
}

/// Admin view over all listings, optionally filtered by status.
pub async fn admin_list(
    pool: &SqlitePool,
    status: Option<&str>,
) -> Result<Vec<ListingWithOwnerRow>, ServiceError> {
    if let Some(status) = status {
        if !VALID_STATUSES.contains(&status) {
            return Err(ServiceError::bad_request(format!(
                "invalid status filter '{status}'"
            )));
        }
    }

    let listings = if let Some(status) = status {
        sqlx::query_as::<_, ListingWithOwnerRow>(
            r#"
            SELECT l.*, u.display_name AS live_name, u.email AS live_email, u.phone AS live_phone
            FROM listings l
            LEFT JOIN users u ON u.id = l.owner_id
            WHERE l.status = ?
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, ListingWithOwnerRow>(
            r#"
            SELECT l.*, u.display_name AS live_name, u.email AS live_email, u.phone AS live_phone
            FROM listings l
            LEFT JOIN users u ON u.id = l.owner_id
            ORDER BY l.created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?
    };

    Ok(listings)
}

fn required_field(value: Option<&str>, name: &str) -> Result<String, ServiceError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Ok(v.to_string()),
        None => Err(ServiceError::bad_request(format!("{name} is required"))),
    }
}

fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Serialize the features form value for storage. A JSON string array is
/// normalized; anything unparseable is stored verbatim rather than rejected.
fn features_column(raw: Option<&str>) -> String {
    match raw {
        None => "[]".to_string(),
        Some(raw) if raw.trim().is_empty() => "[]".to_string(),
        Some(raw) => match serde_json::from_str::<Vec<String>>(raw) {
            Ok(features) => serde_json::to_string(&features).unwrap_or_else(|_| raw.to_string()),
            Err(_) => raw.to_string(),
        },
    }
}

fn encode_files(files: Vec<IngestedFile>, uploaded_at: &str) -> Result<String, ServiceError> {
    let metadata: Vec<FileMetadata> = files
        .into_iter()
        .map(|file| file.into_metadata(uploaded_at))
        .collect();
    serde_json::to_string(&metadata)
        .map_err(|e| ServiceError::internal(format!("failed to encode file metadata: {e}")))
}

/// Build the new value of a file collection on edit: the caller's keep-list
/// (falling back to the stored list when absent or malformed) plus any newly
/// uploaded files. Files omitted from the keep-list are dropped.
fn merged_files(
    existing_json: Option<&str>,
    stored: &str,
    new_files: Vec<IngestedFile>,
    uploaded_at: &str,
) -> Result<String, ServiceError> {
    let mut kept: Vec<FileMetadata> = match existing_json {
        Some(raw) => match serde_json::from_str(raw) {
            Ok(list) => list,
            Err(_) => parse_file_list(stored),
        },
        None => parse_file_list(stored),
    };

    kept.extend(new_files.into_iter().map(|f| f.into_metadata(uploaded_at)));

    serde_json::to_string(&kept)
        .map_err(|e| ServiceError::internal(format!("failed to encode file metadata: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::{create_admin, create_company, create_test_db, fetch_account};
    use async_trait::async_trait;
    use promart_mailer::{MailError, MemoryMailer};
    use sqlx::Row;

    /// Mailer that fails every send, for failure-injection tests.
    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), MailError> {
            Err(MailError::Transport("smtp relay unreachable".to_string()))
        }
    }

    fn fields(title: &str, description: &str, category: &str) -> ListingFields {
        ListingFields {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            category: Some(category.to_string()),
            ..ListingFields::default()
        }
    }

    fn ingested(name: &str) -> IngestedFile {
        IngestedFile {
            name: name.to_string(),
            url: format!("/uploads/{name}"),
            content_type: "application/pdf".to_string(),
            size: 128,
        }
    }

    async fn notification_count(pool: &SqlitePool, kind: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE type = ?")
            .bind(kind)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn submit_creates_pending_listing_with_owner_snapshot() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![],
            vec![],
        )
        .await
        .unwrap();

        assert_eq!(listing.status, "pending");
        assert_eq!(listing.owner_id, owner_id);
        assert_eq!(listing.owner_name, "Steel Works");
        assert_eq!(listing.owner_email, "steel@example.com");
        assert!(!listing.public_id.is_empty());
        assert_eq!(listing.attachments, "[]");
    }

    #[tokio::test]
    async fn submit_notifies_every_admin_once() {
        let (pool, _tmp) = create_test_db().await;
        let a1 = create_admin(&pool, "a1@example.com").await;
        let a2 = create_admin(&pool, "a2@example.com").await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![],
            vec![],
        )
        .await
        .unwrap();

        assert_eq!(notification_count(&pool, "new_listing").await, 2);
        for admin in [a1, a2] {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND type = 'new_listing'",
            )
            .bind(admin)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(count, 1);
        }
        assert_eq!(mailer.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn submit_requires_title_description_and_category() {
        let (pool, _tmp) = create_test_db().await;
        create_admin(&pool, "a1@example.com").await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let missing_category = ListingFields {
            title: Some("Steel Fabrication".to_string()),
            description: Some("Custom steel parts".to_string()),
            category: Some("   ".to_string()),
            ..ListingFields::default()
        };

        let result = submit_listing(&pool, &mailer, &owner, missing_category, vec![], vec![]).await;
        assert!(matches!(result, Err(ServiceError::BadRequest(_))));

        // No fan-out when the primary mutation never happened.
        assert_eq!(notification_count(&pool, "new_listing").await, 0);
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn submit_records_file_metadata_for_both_collections() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![ingested("brochure.pdf")],
            vec![ingested("license.pdf")],
        )
        .await
        .unwrap();

        let attachments = parse_file_list(&listing.attachments);
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].name, "brochure.pdf");
        assert_eq!(attachments[0].content_type, "application/pdf");
        assert_eq!(attachments[0].size, 128);
        assert!(!attachments[0].uploaded_at.is_empty());

        let verification = parse_file_list(&listing.verification_documents);
        assert_eq!(verification.len(), 1);
        assert_eq!(verification[0].name, "license.pdf");
    }

    #[tokio::test]
    async fn approve_sets_status_and_notifies_owner_with_title() {
        let (pool, _tmp) = create_test_db().await;
        create_admin(&pool, "a1@example.com").await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![],
            vec![],
        )
        .await
        .unwrap();

        let approved = approve_listing(&pool, &mailer, &listing.public_id)
            .await
            .unwrap();
        assert_eq!(approved.status, "approved");

        let row = sqlx::query(
            "SELECT message FROM notifications WHERE user_id = ? AND type = 'status_update'",
        )
        .bind(owner_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let message: String = row.get("message");
        assert!(message.contains("Steel Fabrication"));
        assert_eq!(notification_count(&pool, "status_update").await, 1);
    }

    #[tokio::test]
    async fn approve_unknown_listing_is_not_found_and_produces_no_notifications() {
        let (pool, _tmp) = create_test_db().await;
        create_admin(&pool, "a1@example.com").await;
        let mailer = MemoryMailer::new();

        let result = approve_listing(&pool, &mailer, "no-such-listing").await;
        assert!(matches!(result, Err(ServiceError::NotFound)));

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(total, 0);
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn reapproving_an_approved_listing_repeats_the_fan_out() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![],
            vec![],
        )
        .await
        .unwrap();

        approve_listing(&pool, &mailer, &listing.public_id)
            .await
            .unwrap();
        let again = approve_listing(&pool, &mailer, &listing.public_id)
            .await
            .unwrap();

        assert_eq!(again.status, "approved");
        assert_eq!(notification_count(&pool, "status_update").await, 2);
    }

    #[tokio::test]
    async fn reject_with_reason_stores_admin_comment() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![],
            vec![],
        )
        .await
        .unwrap();

        let rejected = reject_listing(
            &pool,
            &mailer,
            &listing.public_id,
            Some("Missing license".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(rejected.status, "rejected");
        assert_eq!(rejected.admin_comment.as_deref(), Some("Missing license"));

        let row = sqlx::query(
            "SELECT message FROM notifications WHERE user_id = ? AND type = 'status_update'",
        )
        .bind(owner_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let message: String = row.get("message");
        assert!(message.contains("Missing license"));
    }

    #[tokio::test]
    async fn reject_without_reason_uses_default_text_but_leaves_comment_unset() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![],
            vec![],
        )
        .await
        .unwrap();

        let rejected = reject_listing(&pool, &mailer, &listing.public_id, Some("  ".to_string()))
            .await
            .unwrap();

        assert_eq!(rejected.status, "rejected");
        assert_eq!(rejected.admin_comment, None);

        let row = sqlx::query("SELECT message FROM notifications WHERE user_id = ?")
            .bind(owner_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        let message: String = row.get("message");
        assert!(message.contains(DEFAULT_REJECTION_REASON));
    }

    #[tokio::test]
    async fn edit_by_non_owner_is_forbidden_and_changes_nothing() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let intruder_id = create_company(&pool, "other@example.com", "Other Co").await;
        let owner = fetch_account(&pool, owner_id).await;
        let intruder = fetch_account(&pool, intruder_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![],
            vec![],
        )
        .await
        .unwrap();

        let result = edit_listing(
            &pool,
            &mailer,
            &listing.public_id,
            &intruder,
            ListingFields {
                description: Some("hijacked".to_string()),
                ..ListingFields::default()
            },
            vec![],
            vec![],
            None,
            None,
        )
        .await;

        assert!(matches!(result, Err(ServiceError::Forbidden)));

        let unchanged = fetch_by_public_id(&pool, &listing.public_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.description, "Custom steel parts");
        assert_eq!(unchanged.status, "pending");
        assert_eq!(notification_count(&pool, "re_approval").await, 0);
    }

    #[tokio::test]
    async fn edit_resets_approved_listing_to_pending_and_renotifies_admins() {
        let (pool, _tmp) = create_test_db().await;
        create_admin(&pool, "a1@example.com").await;
        create_admin(&pool, "a2@example.com").await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![ingested("brochure.pdf")],
            vec![],
        )
        .await
        .unwrap();
        approve_listing(&pool, &mailer, &listing.public_id)
            .await
            .unwrap();

        let edited = edit_listing(
            &pool,
            &mailer,
            &listing.public_id,
            &owner,
            ListingFields {
                description: Some("Now with laser cutting".to_string()),
                ..ListingFields::default()
            },
            vec![],
            vec![],
            Some("[]".to_string()),
            None,
        )
        .await
        .unwrap();

        assert_eq!(edited.status, "pending");
        assert_eq!(edited.description, "Now with laser cutting");
        // Title was not provided, so it survives the partial update.
        assert_eq!(edited.title, "Steel Fabrication");
        // An empty keep-list drops every previously stored attachment.
        assert_eq!(parse_file_list(&edited.attachments).len(), 0);
        assert_eq!(notification_count(&pool, "re_approval").await, 2);
    }

    #[tokio::test]
    async fn edit_with_unchanged_keep_list_is_idempotent_for_files() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![ingested("brochure.pdf"), ingested("pricing.pdf")],
            vec![],
        )
        .await
        .unwrap();

        let edited = edit_listing(
            &pool,
            &mailer,
            &listing.public_id,
            &owner,
            ListingFields::default(),
            vec![],
            vec![],
            Some(listing.attachments.clone()),
            None,
        )
        .await
        .unwrap();

        assert_eq!(edited.attachments, listing.attachments);
    }

    #[tokio::test]
    async fn edit_with_malformed_keep_list_falls_back_to_stored_files() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![ingested("brochure.pdf")],
            vec![],
        )
        .await
        .unwrap();

        let edited = edit_listing(
            &pool,
            &mailer,
            &listing.public_id,
            &owner,
            ListingFields::default(),
            vec![],
            vec![],
            Some("{not valid json".to_string()),
            None,
        )
        .await
        .unwrap();

        let files = parse_file_list(&edited.attachments);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "brochure.pdf");
    }

    #[tokio::test]
    async fn edit_merges_kept_and_new_files() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![ingested("brochure.pdf"), ingested("pricing.pdf")],
            vec![],
        )
        .await
        .unwrap();

        // Keep only the brochure, add a new datasheet.
        let stored = parse_file_list(&listing.attachments);
        let keep = serde_json::to_string(&[stored[0].clone()]).unwrap();

        let edited = edit_listing(
            &pool,
            &mailer,
            &listing.public_id,
            &owner,
            ListingFields::default(),
            vec![ingested("datasheet.pdf")],
            vec![],
            Some(keep),
            None,
        )
        .await
        .unwrap();

        let files = parse_file_list(&edited.attachments);
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["brochure.pdf", "datasheet.pdf"]);
    }

    #[tokio::test]
    async fn edit_stores_unparseable_features_verbatim() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![],
            vec![],
        )
        .await
        .unwrap();

        let edited = edit_listing(
            &pool,
            &mailer,
            &listing.public_id,
            &owner,
            ListingFields {
                features: Some("welding, cutting".to_string()),
                ..ListingFields::default()
            },
            vec![],
            vec![],
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(edited.features, "welding, cutting");
    }

    #[tokio::test]
    async fn operations_survive_a_mailer_that_always_fails() {
        let (pool, _tmp) = create_test_db().await;
        create_admin(&pool, "a1@example.com").await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = FailingMailer;

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![],
            vec![],
        )
        .await
        .unwrap();
        assert_eq!(listing.status, "pending");
        assert_eq!(notification_count(&pool, "new_listing").await, 1);

        let approved = approve_listing(&pool, &mailer, &listing.public_id)
            .await
            .unwrap();
        assert_eq!(approved.status, "approved");
        assert_eq!(notification_count(&pool, "status_update").await, 1);

        let edited = edit_listing(
            &pool,
            &mailer,
            &listing.public_id,
            &owner,
            ListingFields::default(),
            vec![],
            vec![],
            None,
            None,
        )
        .await
        .unwrap();
        assert_eq!(edited.status, "pending");
        assert_eq!(notification_count(&pool, "re_approval").await, 1);

        let rejected = reject_listing(&pool, &mailer, &listing.public_id, None)
            .await
            .unwrap();
        assert_eq!(rejected.status, "rejected");
    }

    #[tokio::test]
    async fn delete_listing_removes_row_and_unknown_id_is_not_found() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let owner = fetch_account(&pool, owner_id).await;
        let mailer = MemoryMailer::new();

        let listing = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![],
            vec![],
        )
        .await
        .unwrap();

        delete_listing(&pool, &listing.public_id).await.unwrap();
        assert!(fetch_by_public_id(&pool, &listing.public_id)
            .await
            .unwrap()
            .is_none());

        let result = delete_listing(&pool, &listing.public_id).await;
        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn queries_filter_by_status_and_owner() {
        let (pool, _tmp) = create_test_db().await;
        let owner_id = create_company(&pool, "steel@example.com", "Steel Works").await;
        let other_id = create_company(&pool, "timber@example.com", "Timber Co").await;
        let owner = fetch_account(&pool, owner_id).await;
        let other = fetch_account(&pool, other_id).await;
        let mailer = MemoryMailer::new();

        let first = submit_listing(
            &pool,
            &mailer,
            &owner,
            fields("Steel Fabrication", "Custom steel parts", "Manufacturing"),
            vec![],
            vec![],
        )
        .await
        .unwrap();
        submit_listing(
            &pool,
            &mailer,
            &other,
            fields("Timber Supply", "Hardwood and softwood", "Materials"),
            vec![],
            vec![],
        )
        .await
        .unwrap();

        approve_listing(&pool, &mailer, &first.public_id)
            .await
            .unwrap();

        let approved = list_approved(&pool).await.unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].listing.title, "Steel Fabrication");
        // Live owner details come from the users table via the join.
        assert_eq!(approved[0].live_name.as_deref(), Some("Steel Works"));

        let mine = list_mine(&pool, owner_id).await.unwrap();
        assert_eq!(mine.len(), 1);

        let pending = admin_list(&pool, Some("pending")).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].listing.title, "Timber Supply");

        let all = admin_list(&pool, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let invalid = admin_list(&pool, Some("published")).await;
        assert!(matches!(invalid, Err(ServiceError::BadRequest(_))));
    }
}
