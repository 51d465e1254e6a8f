//! Admin account management for company accounts.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::{
    routes::models::{
        CompaniesResponse, CompanyResponse, CompanyStatusResponse, MessageResponse,
        SetCompanyActiveRequest,
    },
    services::account,
    util::{require_admin, require_bearer},
    ApiError, AppState,
};

pub async fn list_companies(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CompaniesResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (actor, _) = state.authenticate(&token).await?;
    require_admin(&actor)?;

    let companies = account::list_companies(state.db_pool())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(CompaniesResponse {
        companies: companies.into_iter().map(CompanyResponse::from).collect(),
    }))
}

pub async fn set_company_active(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetCompanyActiveRequest>,
) -> Result<Json<CompanyStatusResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (actor, _) = state.authenticate(&token).await?;
    require_admin(&actor)?;

    let company = account::set_company_active(state.db_pool(), &company_id, req.is_active)
        .await
        .map_err(ApiError::from)?;

    let message = if req.is_active {
        "Company activated"
    } else {
        "Company deactivated"
    };

    Ok(Json(CompanyStatusResponse {
        message: message.to_string(),
        company: company.into(),
    }))
}

pub async fn delete_company(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (actor, _) = state.authenticate(&token).await?;
    require_admin(&actor)?;

    account::delete_company(state.db_pool(), &company_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(MessageResponse {
        message: "Company deleted".to_string(),
    }))
}
