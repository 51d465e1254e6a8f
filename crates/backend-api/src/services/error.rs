#[derive(Debug)]
pub enum ServiceError {
    NotFound,
    Forbidden,
    BadRequest(String),
    Database(sqlx::Error),
    Internal(String),
}

impl ServiceError {
    pub fn not_found(_msg: impl Into<String>) -> Self {
        Self::NotFound
    }

    pub fn forbidden(_msg: impl Into<String>) -> Self {
        Self::Forbidden
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<ServiceError> for crate::ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound => crate::ApiError::not_found("Resource not found"),
            ServiceError::Forbidden => crate::ApiError::forbidden("Access denied"),
            ServiceError::BadRequest(msg) => crate::ApiError::bad_request(&msg),
            ServiceError::Database(db_err) => {
                tracing::error!("Database error: {}", db_err);
                crate::ApiError::internal_server_error("Database operation failed")
            }
            ServiceError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                crate::ApiError::internal_server_error(&msg)
            }
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}
