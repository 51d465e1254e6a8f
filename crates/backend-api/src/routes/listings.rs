//! Company-facing and public listing routes. Both write routes accept
//! multipart forms: text fields plus `attachments[]` and
//! `verificationDocuments[]` file parts.

use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    routes::models::ListingResponse,
    services::{
        files::{self, IngestedFile},
        listing::{self, ListingFields},
    },
    util::require_bearer,
    ApiError, AppState,
};

/// Everything a listing multipart form can carry.
#[derive(Default)]
struct ListingForm {
    fields: ListingFields,
    attachments: Vec<IngestedFile>,
    verification_documents: Vec<IngestedFile>,
    existing_attachments: Option<String>,
    existing_verification_documents: Option<String>,
}

async fn read_listing_form(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<ListingForm, ApiError> {
    let mut form = ListingForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart payload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;

            let ingested = files::store_upload(state.uploads(), &file_name, &content_type, &data)
                .await
                .map_err(ApiError::from)?;

            match name.as_str() {
                "attachments" | "attachments[]" => form.attachments.push(ingested),
                "verificationDocuments" | "verificationDocuments[]" => {
                    form.verification_documents.push(ingested)
                }
                _ => {
                    tracing::warn!(field = %name, "ignoring file part with unknown field name");
                }
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("failed to read field: {e}")))?;

            match name.as_str() {
                "title" => form.fields.title = Some(value),
                "description" => form.fields.description = Some(value),
                "category" => form.fields.category = Some(value),
                "location" => form.fields.location = Some(value),
                "website" => form.fields.website = Some(value),
                "features" => form.fields.features = Some(value),
                "existingAttachments" => form.existing_attachments = Some(value),
                "existingVerificationDocuments" => {
                    form.existing_verification_documents = Some(value)
                }
                // A client-supplied status never reaches the workflow.
                _ => {}
            }
        }
    }

    Ok(form)
}

pub async fn create_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    let form = read_listing_form(&state, &mut multipart).await?;

    let listing = listing::submit_listing(
        state.db_pool(),
        state.mailer(),
        &account,
        form.fields,
        form.attachments,
        form.verification_documents,
    )
    .await
    .map_err(ApiError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(ListingResponse::from_row(listing)),
    ))
}

pub async fn update_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<ListingResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    let form = read_listing_form(&state, &mut multipart).await?;

    let listing = listing::edit_listing(
        state.db_pool(),
        state.mailer(),
        &listing_id,
        &account,
        form.fields,
        form.attachments,
        form.verification_documents,
        form.existing_attachments,
        form.existing_verification_documents,
    )
    .await
    .map_err(ApiError::from)?;

    Ok(Json(ListingResponse::from_row(listing)))
}

pub async fn list_approved(
    State(state): State<AppState>,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    let listings = listing::list_approved(state.db_pool())
        .await
        .map_err(ApiError::from)?;

    let responses = listings
        .into_iter()
        .map(ListingResponse::from_row_with_owner)
        .collect();
    Ok(Json(responses))
}

pub async fn list_my(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    let listings = listing::list_mine(state.db_pool(), account.id)
        .await
        .map_err(ApiError::from)?;

    let responses = listings.into_iter().map(ListingResponse::from_row).collect();
    Ok(Json(responses))
}
