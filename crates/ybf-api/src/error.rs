use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use ybf_storage::StorageError;
use ybf_storage::normalize::ImageError;
use ybf_types::admin::AdminAction;
use ybf_types::api::ErrorBody;
use ybf_types::query::QueryError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("missing or invalid session")]
    Unauthorized,
    #[error("session is not valid for {0}")]
    Forbidden(AdminAction),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    UnsupportedMediaType(String),
    #[error("Too many attempts")]
    TooManyRequests,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidKey(key) => Self::BadRequest(format!("invalid object key '{}'", key)),
            e @ StorageError::AlreadyExists { .. } => Self::Conflict(e.to_string()),
            StorageError::Io(e) => Self::Internal(e.into()),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::Unsupported => Self::UnsupportedMediaType(e.to_string()),
            ImageError::Decode(_) => Self::BadRequest(e.to_string()),
            ImageError::Encode(_) => Self::Internal(anyhow::anyhow!(e.to_string())),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {}", e);
        Self::Internal(e.into())
    }
}

/// Trimmed value of a required text field.
pub fn required(field: &str, value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trimmed optional text, with blank treated as absent.
pub fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden(AdminAction::BlogCreate).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(ImageError::Unsupported).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ApiError::from(ImageError::Decode("eof".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn presence_validation_trims() {
        assert_eq!(required("title", "  Camp  ").unwrap(), "Camp");
        assert!(matches!(required("title", "   "), Err(ApiError::BadRequest(m)) if m == "title is required"));
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(Some(" x ")).as_deref(), Some("x"));
        assert_eq!(optional(None), None);
    }
}
