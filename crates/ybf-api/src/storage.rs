use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use ybf_types::models::Bucket;

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult};

/// GET /storage/{bucket}/{*key}: public object download with the stored
/// content type and a strong ETag from the content hash.
pub async fn download_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let bucket: Bucket = bucket.parse().map_err(|_| ApiError::NotFound("bucket"))?;

    let db = state.db.clone();
    let lookup_key = key.clone();
    let meta = blocking(move || db.get_storage_object(bucket.as_str(), &lookup_key))
        .await?
        .ok_or(ApiError::NotFound("object"))?;

    let etag = format!("\"{}\"", meta.sha256);
    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|tag| tag.trim() == etag));
    if not_modified {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let data = state
        .storage
        .get(bucket, &key)
        .await?
        .ok_or(ApiError::NotFound("object"))?;

    let content_type = HeaderValue::from_str(&meta.content_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    let etag = HeaderValue::from_str(&etag).map_err(|e| ApiError::Internal(e.into()))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::ETAG, etag),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=3600"),
            ),
        ],
        Body::from(data),
    )
        .into_response())
}
