use promart_auth::{Account, AuthSession, Role};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Metadata describing one stored upload. This is the wire shape for both
/// listing attachments and verification documents; the same JSON is persisted
/// verbatim in the listing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: i64,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: String,
}

/// Parse a stored file-collection column. Malformed JSON yields an empty
/// list; the edit path has its own fallback semantics on top of this.
pub fn parse_file_list(raw: &str) -> Vec<FileMetadata> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Parse the stored features column. The column normally holds a JSON string
/// array, but the edit path stores unparseable client input verbatim, so the
/// read side surfaces such a value as a single feature.
pub fn parse_features(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(features) => features,
        Err(_) if raw.trim().is_empty() => Vec::new(),
        Err(_) => vec![raw.to_string()],
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ListingRow {
    pub id: i64,
    pub public_id: String,
    pub owner_id: i64,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_phone: Option<String>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub website: Option<String>,
    pub features: String,
    pub attachments: String,
    pub verification_documents: String,
    pub status: String,
    pub admin_comment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Listing row joined with the owning account's live contact details. The
/// snapshot columns stay on the row as an audit trail; list views prefer the
/// live values when the account still exists.
#[derive(Debug, Clone, FromRow)]
pub struct ListingWithOwnerRow {
    #[sqlx(flatten)]
    pub listing: ListingRow,
    pub live_name: Option<String>,
    pub live_email: Option<String>,
    pub live_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerSummary {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: String,
    pub owner: OwnerSummary,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub website: Option<String>,
    pub features: Vec<String>,
    pub attachments: Vec<FileMetadata>,
    pub verification_documents: Vec<FileMetadata>,
    pub status: String,
    pub admin_comment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ListingResponse {
    /// Build a response from a bare row, using the owner snapshot taken at
    /// submission time.
    pub fn from_row(row: ListingRow) -> Self {
        let owner = OwnerSummary {
            name: row.owner_name.clone(),
            email: row.owner_email.clone(),
            phone: row.owner_phone.clone(),
        };
        Self::build(row, owner)
    }

    /// Build a response preferring the live account contact details over the
    /// snapshot.
    pub fn from_row_with_owner(row: ListingWithOwnerRow) -> Self {
        let ListingWithOwnerRow {
            listing,
            live_name,
            live_email,
            live_phone,
        } = row;
        let owner = OwnerSummary {
            name: live_name.unwrap_or_else(|| listing.owner_name.clone()),
            email: live_email.unwrap_or_else(|| listing.owner_email.clone()),
            phone: live_phone.or_else(|| listing.owner_phone.clone()),
        };
        Self::build(listing, owner)
    }

    fn build(row: ListingRow, owner: OwnerSummary) -> Self {
        Self {
            id: row.public_id,
            owner,
            title: row.title,
            description: row.description,
            category: row.category,
            location: row.location,
            website: row.website,
            features: parse_features(&row.features),
            attachments: parse_file_list(&row.attachments),
            verification_documents: parse_file_list(&row.verification_documents),
            status: row.status,
            admin_comment: row.admin_comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminListingsResponse {
    pub success: bool,
    pub count: usize,
    pub listings: Vec<ListingResponse>,
}

#[derive(Debug, Serialize)]
pub struct ModeratedListingResponse {
    pub message: String,
    pub listing: ListingResponse,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectListingRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminListingsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub listing_id: Option<i64>,
    pub read: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub notification: Notification,
}

#[derive(Debug, Deserialize)]
pub struct MarkNotificationReadRequest {
    pub read: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub phone: Option<String>,
    pub company_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub company_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
    pub phone: Option<String>,
    pub company_name: String,
    pub role: Role,
    pub is_active: bool,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.public_id,
            email: account.email,
            phone: account.phone,
            company_name: account.display_name,
            role: account.role,
            is_active: account.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub account: AccountResponse,
    pub expires_at: String,
}

impl SessionResponse {
    pub fn new(session: AuthSession, account: Account) -> Self {
        Self {
            token: session.token,
            account: account.into(),
            expires_at: session.expires_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateContactMessageRequest {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactMessagesResponse {
    pub messages: Vec<ContactMessage>,
}

#[derive(Debug, Serialize)]
pub struct ContactMessageResponse {
    pub message: ContactMessage,
}

#[derive(Debug, Deserialize)]
pub struct ContactMessagesQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BlogPostRow {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub body: String,
    pub category: String,
    pub author: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostResponse {
    pub id: String,
    pub title: String,
    pub body: String,
    pub category: String,
    pub author: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<BlogPostRow> for BlogPostResponse {
    fn from(row: BlogPostRow) -> Self {
        Self {
            id: row.public_id,
            title: row.title,
            body: row.body,
            category: row.category,
            author: row.author,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlogPostsResponse {
    pub posts: Vec<BlogPostResponse>,
}

#[derive(Debug, Serialize)]
pub struct SingleBlogPostResponse {
    pub post: BlogPostResponse,
}

#[derive(Debug, Deserialize)]
pub struct CreateBlogPostRequest {
    pub title: String,
    pub body: String,
    pub category: String,
    pub author: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBlogPostRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BlogQuery {
    pub category: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CompanyRow {
    pub public_id: String,
    pub email: String,
    pub phone: Option<String>,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: String,
    pub listing_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyResponse {
    pub id: String,
    pub email: String,
    pub phone: Option<String>,
    pub company_name: String,
    pub is_active: bool,
    pub created_at: String,
    pub listing_count: i64,
}

impl From<CompanyRow> for CompanyResponse {
    fn from(row: CompanyRow) -> Self {
        Self {
            id: row.public_id,
            email: row.email,
            phone: row.phone,
            company_name: row.display_name,
            is_active: row.is_active,
            created_at: row.created_at,
            listing_count: row.listing_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompaniesResponse {
    pub companies: Vec<CompanyResponse>,
}

#[derive(Debug, Serialize)]
pub struct CompanyStatusResponse {
    pub message: String,
    pub company: CompanyResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCompanyActiveRequest {
    pub is_active: bool,
}
