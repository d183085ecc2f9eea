use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use ybf_types::api::SubmitTestimonyRequest;
use ybf_types::events::ChangeEvent;
use ybf_types::models::Testimony;
use ybf_types::query::{ListQuery, Table};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiResult, required};

/// GET /testimonies, approved only.
pub async fn list_testimonies(State(state): State<AppState>) -> ApiResult<Json<Vec<Testimony>>> {
    let mut query = ListQuery::new(Table::Testimonies);
    if let Some(filter) = Table::Testimonies.public_filter() {
        query = query.filter(filter);
    }

    let db = state.db.clone();
    let rows = blocking(move || db.list::<Testimony>(&query)).await?;
    Ok(Json(rows))
}

/// POST /testimonies. Without an explicit flag the server's auto-approve
/// setting decides visibility.
pub async fn submit_testimony(
    State(state): State<AppState>,
    Json(req): Json<SubmitTestimonyRequest>,
) -> ApiResult<impl IntoResponse> {
    let testimony = Testimony {
        id: Uuid::new_v4(),
        name: required("name", &req.name)?,
        testimony: required("testimony", &req.testimony)?,
        approved: req.approved.unwrap_or(state.settings.testimony_auto_approve),
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let row = testimony.clone();
    blocking(move || db.insert_testimony(&row)).await?;

    state
        .dispatcher
        .broadcast(ChangeEvent::inserted(Table::Testimonies, &testimony));

    Ok((StatusCode::CREATED, Json(testimony)))
}
