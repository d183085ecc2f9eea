use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use ybf_types::admin::{AdminAction, SessionClaims};
use ybf_types::api::CreateGalleryImageRequest;
use ybf_types::events::ChangeEvent;
use ybf_types::models::{Bucket, GalleryImage};
use ybf_types::query::{ListQuery, Table};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult, optional};
use crate::middleware::authorize;
use crate::uploads;

const IMAGE_PREFIX: &str = "gallery";

pub async fn list_gallery(State(state): State<AppState>) -> ApiResult<Json<Vec<GalleryImage>>> {
    let db = state.db.clone();
    let rows = blocking(move || db.list::<GalleryImage>(&ListQuery::new(Table::GalleryImages))).await?;
    Ok(Json(rows))
}

/// POST /admin/gallery. The image is normalized to JPEG before anything is
/// written.
pub async fn create_image(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(req): Json<CreateGalleryImageRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize(&claims, AdminAction::MessagesGallery)?;

    let jpeg = uploads::jpeg_from_upload("image", &req.image).await?;
    let key = uploads::image_key(IMAGE_PREFIX, &req.image.file_name);
    let upload = uploads::store_jpeg(&state, Bucket::Gallery, key, &jpeg).await?;

    let image = GalleryImage {
        id: Uuid::new_v4(),
        title: optional(req.title.as_deref()),
        image_url: upload.url.clone(),
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let row = image.clone();
    uploads::insert_or_discard(&state, std::slice::from_ref(&upload), move || {
        db.insert_gallery_image(&row)
    })
    .await?;

    info!("Gallery image {} stored at {}", image.id, upload.key);
    state
        .dispatcher
        .broadcast(ChangeEvent::inserted(Table::GalleryImages, &image));

    Ok((StatusCode::CREATED, Json(image)))
}

/// DELETE /admin/gallery/{id}: removes the row, then its stored image.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<StatusCode> {
    authorize(&claims, AdminAction::MessagesGallery)?;

    let db = state.db.clone();
    let removed = blocking(move || db.delete_gallery_image(id))
        .await?
        .ok_or(ApiError::NotFound("gallery image"))?;

    state
        .dispatcher
        .broadcast(ChangeEvent::deleted(Table::GalleryImages, &removed));

    // The row is gone either way; a leftover object is picked up by the sweep.
    match ybf_storage::object_ref(&removed.image_url) {
        Some((bucket, key)) => {
            if let Err(e) = uploads::remove_object(&state, bucket, &key).await {
                warn!("Failed to delete object for gallery image {}: {}", id, e);
            }
        }
        None => warn!("Gallery image {} has a foreign URL {}", id, removed.image_url),
    }

    info!("Gallery image {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}
