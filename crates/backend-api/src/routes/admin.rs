//! Admin moderation surface for listings.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};

use crate::{
    routes::models::{
        AdminListingsQuery, AdminListingsResponse, ListingResponse, MessageResponse,
        ModeratedListingResponse, RejectListingRequest,
    },
    services::listing,
    util::{require_admin, require_bearer},
    ApiError, AppState,
};

pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<AdminListingsQuery>,
    headers: HeaderMap,
) -> Result<Json<AdminListingsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    require_admin(&account)?;

    let listings = listing::admin_list(state.db_pool(), query.status.as_deref())
        .await
        .map_err(ApiError::from)?;

    let listings: Vec<ListingResponse> = listings
        .into_iter()
        .map(ListingResponse::from_row_with_owner)
        .collect();

    Ok(Json(AdminListingsResponse {
        success: true,
        count: listings.len(),
        listings,
    }))
}

pub async fn approve_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ModeratedListingResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    require_admin(&account)?;

    let listing = listing::approve_listing(state.db_pool(), state.mailer(), &listing_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ModeratedListingResponse {
        message: "Listing approved".to_string(),
        listing: ListingResponse::from_row(listing),
    }))
}

pub async fn reject_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RejectListingRequest>,
) -> Result<Json<ModeratedListingResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    require_admin(&account)?;

    let listing = listing::reject_listing(state.db_pool(), state.mailer(), &listing_id, req.reason)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ModeratedListingResponse {
        message: "Listing rejected".to_string(),
        listing: ListingResponse::from_row(listing),
    }))
}

pub async fn delete_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    require_admin(&account)?;

    listing::delete_listing(state.db_pool(), &listing_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(MessageResponse {
        message: "Listing deleted".to_string(),
    }))
}
