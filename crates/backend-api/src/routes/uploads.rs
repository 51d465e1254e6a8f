//! Serving stored uploads back to clients. The multipart ingestion side
//! lives in `services::files`.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{services::files, ApiError, AppState};

pub async fn serve_upload(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, ApiError> {
    let path = files::resolve_stored_file(state.uploads(), &file_name).map_err(ApiError::from)?;

    let data = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found("File not found"))?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    Ok(([(header::CONTENT_TYPE, mime.essence_str().to_string())], data).into_response())
}
