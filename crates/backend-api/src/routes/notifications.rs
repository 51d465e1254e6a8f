use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{
    routes::models::{
        MarkNotificationReadRequest, NotificationResponse, NotificationsResponse,
    },
    services::notification,
    util::require_bearer,
    ApiError, AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn get_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    let unread_only = query.unread_only.unwrap_or(false);
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let notifications =
        notification::list_notifications(state.db_pool(), account.id, unread_only, limit, offset)
            .await
            .map_err(ApiError::from)?;

    Ok(Json(NotificationsResponse { notifications }))
}

pub async fn get_unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    let count = notification::unread_count(state.db_pool(), account.id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(serde_json::json!({ "unread_count": count })))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<MarkNotificationReadRequest>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    let notification =
        notification::mark_read(state.db_pool(), account.id, notification_id, req.read)
            .await
            .map_err(ApiError::from)?;

    Ok(Json(NotificationResponse { notification }))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    let updated = notification::mark_all_read(state.db_pool(), account.id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(serde_json::json!({ "updated_count": updated })))
}
