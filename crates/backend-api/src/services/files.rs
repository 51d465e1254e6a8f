//! Upload ingestion. The multipart layer hands each file here before the
//! workflow runs; the workflow itself only ever sees the resulting metadata.

use std::path::{Path, PathBuf};

use promart_config::UploadsConfig;
use uuid::Uuid;

use super::error::ServiceError;
use crate::routes::models::FileMetadata;

/// One uploaded file after its bytes have been placed in durable storage.
#[derive(Debug, Clone)]
pub struct IngestedFile {
    pub name: String,
    pub url: String,
    pub content_type: String,
    pub size: i64,
}

impl IngestedFile {
    pub fn into_metadata(self, uploaded_at: &str) -> FileMetadata {
        FileMetadata {
            name: self.name,
            url: self.url,
            content_type: self.content_type,
            size: self.size,
            uploaded_at: uploaded_at.to_string(),
        }
    }
}

/// Write an uploaded file into the uploads directory under a fresh stored
/// name and return its metadata. The original name survives only in the
/// metadata, never on disk.
pub async fn store_upload(
    uploads: &UploadsConfig,
    original_name: &str,
    content_type: &str,
    data: &[u8],
) -> Result<IngestedFile, ServiceError> {
    let stored_name = match sanitized_extension(original_name) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    };

    let dir = PathBuf::from(&uploads.directory);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ServiceError::internal(format!("failed to create uploads dir: {e}")))?;

    let path = dir.join(&stored_name);
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| ServiceError::internal(format!("failed to store upload: {e}")))?;

    Ok(IngestedFile {
        name: original_name.to_string(),
        url: format!(
            "{}/{}",
            uploads.public_base_url.trim_end_matches('/'),
            stored_name
        ),
        content_type: content_type.to_string(),
        size: data.len() as i64,
    })
}

/// Resolve a stored upload for serving. Rejects anything that is not a plain
/// file name inside the uploads directory.
pub fn resolve_stored_file(uploads: &UploadsConfig, file_name: &str) -> Result<PathBuf, ServiceError> {
    if file_name.is_empty()
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains("..")
    {
        return Err(ServiceError::bad_request("invalid file name"));
    }

    Ok(Path::new(&uploads.directory).join(file_name))
}

fn sanitized_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
