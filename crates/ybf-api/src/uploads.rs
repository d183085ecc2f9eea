use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use ybf_db::models::StorageObjectRow;
use ybf_storage::normalize::{self, JPEG_CONTENT_TYPE};
use ybf_storage::{extension, sanitize_stem};
use ybf_types::api::UploadFile;
use ybf_types::models::Bucket;

use crate::auth::AppStateInner;
use crate::blocking;
use crate::error::{ApiError, ApiResult};

/// An object stored for the current request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bucket: Bucket,
    pub key: String,
    pub url: String,
}

pub fn decode_base64(field: &str, file: &UploadFile) -> ApiResult<Vec<u8>> {
    let data = B64
        .decode(file.data.trim())
        .map_err(|_| ApiError::BadRequest(format!("{} is not valid base64", field)))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is empty", field)));
    }
    Ok(data)
}

/// Decode an uploaded image and bring it to JPEG. Runs before any write, so
/// a rejected image leaves nothing behind.
pub async fn jpeg_from_upload(field: &str, file: &UploadFile) -> ApiResult<Vec<u8>> {
    let data = decode_base64(field, file)?;
    let file_name = file.file_name.clone();
    let content_type = file.content_type.clone();
    let normalized = tokio::task::spawn_blocking(move || {
        normalize::normalize_to_jpeg(&file_name, content_type.as_deref(), &data)
    })
    .await??;
    Ok(normalized.data)
}

/// `{prefix}/{unix_millis}-{stem}.jpg`
pub fn image_key(prefix: &str, file_name: &str) -> String {
    format!(
        "{}/{}-{}.jpg",
        prefix,
        Utc::now().timestamp_millis(),
        sanitize_stem(file_name)
    )
}

/// `{uuid}.{ext}`
pub fn uuid_key(file_name: &str) -> String {
    let ext = extension(file_name).unwrap_or_else(|| "bin".into());
    format!("{}.{}", Uuid::new_v4(), ext)
}

/// `{unix_millis}-{stem}.{ext}`
pub fn timestamped_key(file_name: &str) -> String {
    let ext = extension(file_name).unwrap_or_else(|| "bin".into());
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        sanitize_stem(file_name),
        ext
    )
}

/// Store bytes (never overwriting) and record their metadata.
pub async fn store(
    state: &AppStateInner,
    bucket: Bucket,
    key: String,
    content_type: &str,
    data: &[u8],
) -> ApiResult<Upload> {
    let stored = state.storage.put(bucket, &key, data).await?;

    let row = StorageObjectRow {
        bucket: bucket.as_str().to_string(),
        key: key.clone(),
        content_type: content_type.to_string(),
        size: stored.size as i64,
        sha256: stored.sha256,
        created_at: Utc::now(),
    };
    let db = state.db.clone();
    if let Err(e) = blocking(move || db.insert_storage_object(&row)).await {
        if let Err(cleanup) = state.storage.delete(bucket, &key).await {
            warn!("Failed to remove {}/{} after metadata error: {}", bucket, key, cleanup);
        }
        return Err(e);
    }

    debug!("Stored {}/{} ({} bytes)", bucket, key, stored.size);
    Ok(Upload {
        url: state.storage.public_url(bucket, &key),
        bucket,
        key,
    })
}

/// Content type recorded for a non-image upload: what the client declared,
/// else a guess from the key.
pub fn declared_content_type(file: &UploadFile, key: &str) -> String {
    file.content_type
        .as_deref()
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| normalize::content_type_for(key))
        .to_string()
}

pub async fn store_jpeg(
    state: &AppStateInner,
    bucket: Bucket,
    key: String,
    data: &[u8],
) -> ApiResult<Upload> {
    store(state, bucket, key, JPEG_CONTENT_TYPE, data).await
}

/// Remove objects stored earlier in a request whose row insert failed.
pub async fn discard(state: &AppStateInner, uploads: &[Upload]) {
    for upload in uploads {
        if let Err(e) = remove_object(state, upload.bucket, &upload.key).await {
            warn!("Failed to discard {}/{}: {}", upload.bucket, upload.key, e);
        }
    }
}

/// Delete an object's bytes and metadata.
pub async fn remove_object(state: &AppStateInner, bucket: Bucket, key: &str) -> ApiResult<()> {
    state.storage.delete(bucket, key).await?;
    let db = state.db.clone();
    let key = key.to_string();
    blocking(move || db.delete_storage_object(bucket.as_str(), &key)).await?;
    Ok(())
}

/// Run a row insert for already-stored uploads; if it fails, the uploads are
/// removed before the error is returned.
pub async fn insert_or_discard<T, F>(
    state: &AppStateInner,
    uploads: &[Upload],
    insert: F,
) -> ApiResult<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match blocking(insert).await {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!("Row insert failed, discarding {} uploaded object(s)", uploads.len());
            discard(state, uploads).await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_bucket_conventions() {
        let key = image_key("blog", "My Photo.png");
        assert!(key.starts_with("blog/"));
        assert!(key.ends_with("-My-Photo.jpg"));

        let key = uuid_key("cover.PNG");
        assert!(key.ends_with(".png"));
        assert!(Uuid::parse_str(key.trim_end_matches(".png")).is_ok());
        assert!(uuid_key("book").ends_with(".bin"));

        let key = timestamped_key("Sunday Service.mp3");
        assert!(key.ends_with("-Sunday-Service.mp3"));
        assert!(!key.contains('/'));
    }

    #[test]
    fn base64_must_decode_to_bytes() {
        let file = |data: &str| UploadFile {
            file_name: "a.png".into(),
            content_type: None,
            data: data.into(),
        };
        assert_eq!(decode_base64("image", &file("aGk=")).unwrap(), b"hi");
        assert!(decode_base64("image", &file("***")).is_err());
        assert!(decode_base64("image", &file("")).is_err());
    }

    #[test]
    fn declared_type_falls_back_to_extension() {
        let file = UploadFile {
            file_name: "talk.mp3".into(),
            content_type: Some(" ".into()),
            data: String::new(),
        };
        assert_eq!(declared_content_type(&file, "1-talk.mp3"), "audio/mpeg");
    }
}
