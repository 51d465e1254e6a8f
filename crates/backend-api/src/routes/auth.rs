use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};

use crate::{
    routes::models::{
        AccountResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
        SessionResponse, UpdateProfileRequest,
    },
    services,
    util::require_bearer,
    ApiError, AppState,
};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let company_name = req.company_name.trim();

    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("a valid email is required"));
    }
    if company_name.is_empty() {
        return Err(ApiError::bad_request("company name is required"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request(
            "password must be at least 8 characters",
        ));
    }

    let account = state
        .authenticator()
        .register_company(&email, req.phone.as_deref(), company_name, &req.password)
        .await?;

    let session = state
        .authenticator()
        .login_with_password(&email, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new(session, account)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();

    let session = state
        .authenticator()
        .login_with_password(&email, &req.password)
        .await?;
    let account = state
        .authenticator()
        .user_profile(session.user_id)
        .await?;

    Ok(Json(SessionResponse::new(session, account)))
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AccountResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    Ok(Json(account.into()))
}

pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    if req.new_password.len() < 8 {
        return Err(ApiError::bad_request(
            "password must be at least 8 characters",
        ));
    }

    state
        .authenticator()
        .change_password(account.id, &req.current_password, &req.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password updated".to_string(),
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    services::account::update_profile(state.db_pool(), account.id, req.company_name, req.phone)
        .await
        .map_err(ApiError::from)?;

    let refreshed = state.authenticator().user_profile(account.id).await?;
    Ok(Json(refreshed.into()))
}
