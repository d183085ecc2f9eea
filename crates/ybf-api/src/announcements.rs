use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use ybf_types::admin::{AdminAction, SessionClaims};
use ybf_types::api::CreateAnnouncementRequest;
use ybf_types::events::ChangeEvent;
use ybf_types::models::Announcement;
use ybf_types::query::{ListQuery, Table};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult, required};
use crate::middleware::authorize;

/// GET /announcements, latest first.
pub async fn list_announcements(State(state): State<AppState>) -> ApiResult<Json<Vec<Announcement>>> {
    let db = state.db.clone();
    let rows = blocking(move || db.list::<Announcement>(&ListQuery::new(Table::Announcements))).await?;
    Ok(Json(rows))
}

pub async fn create_announcement(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(req): Json<CreateAnnouncementRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize(&claims, AdminAction::Announcement)?;

    let announcement = Announcement {
        id: Uuid::new_v4(),
        title: required("title", &req.title)?,
        content: required("content", &req.content)?,
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let row = announcement.clone();
    blocking(move || db.insert_announcement(&row)).await?;

    info!("Announcement {} posted", announcement.id);
    state
        .dispatcher
        .broadcast(ChangeEvent::inserted(Table::Announcements, &announcement));

    Ok((StatusCode::CREATED, Json(announcement)))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<StatusCode> {
    authorize(&claims, AdminAction::Announcement)?;

    let db = state.db.clone();
    let removed = blocking(move || db.delete_announcement(id))
        .await?
        .ok_or(ApiError::NotFound("announcement"))?;

    info!("Announcement {} deleted", id);
    state
        .dispatcher
        .broadcast(ChangeEvent::deleted(Table::Announcements, &removed));

    Ok(StatusCode::NO_CONTENT)
}
