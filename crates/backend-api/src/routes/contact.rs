use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    routes::models::{
        ContactMessageResponse, ContactMessagesQuery, ContactMessagesResponse,
        CreateContactMessageRequest, MessageResponse,
    },
    services::contact,
    util::{require_admin, require_bearer},
    ApiError, AppState,
};

/// Public contact-form submission.
pub async fn submit_message(
    State(state): State<AppState>,
    Json(req): Json<CreateContactMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = contact::create_message(state.db_pool(), req)
        .await
        .map_err(ApiError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(ContactMessageResponse { message }),
    ))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ContactMessagesQuery>,
    headers: HeaderMap,
) -> Result<Json<ContactMessagesResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    require_admin(&account)?;

    let messages = contact::list_messages(state.db_pool(), query.status.as_deref())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ContactMessagesResponse { messages }))
}

pub async fn mark_message_read(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<ContactMessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    require_admin(&account)?;

    let message = contact::mark_message_read(state.db_pool(), message_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ContactMessageResponse { message }))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    require_admin(&account)?;

    contact::delete_message(state.db_pool(), message_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(MessageResponse {
        message: "Contact message deleted".to_string(),
    }))
}
