use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use ybf_types::admin::{AdminAction, SessionClaims};
use ybf_types::api::CreateMessageRequest;
use ybf_types::events::ChangeEvent;
use ybf_types::models::{AudioMessage, Bucket};
use ybf_types::query::{ListQuery, Table};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiResult, required};
use crate::middleware::authorize;
use crate::uploads;

pub async fn list_messages(State(state): State<AppState>) -> ApiResult<Json<Vec<AudioMessage>>> {
    let db = state.db.clone();
    let rows = blocking(move || db.list::<AudioMessage>(&ListQuery::new(Table::Messages))).await?;
    Ok(Json(rows))
}

/// POST /admin/messages: audio goes to the `messages` bucket as sent.
pub async fn create_message(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(req): Json<CreateMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize(&claims, AdminAction::MessagesGallery)?;

    let title = required("title", &req.title)?;
    let date = required("date", &req.date)?;
    let audio = uploads::decode_base64("audio", &req.audio)?;

    let key = uploads::timestamped_key(&req.audio.file_name);
    let content_type = uploads::declared_content_type(&req.audio, &key);
    let upload = uploads::store(&state, Bucket::Messages, key, &content_type, &audio).await?;

    let message = AudioMessage {
        id: Uuid::new_v4(),
        title,
        date,
        audio_url: upload.url.clone(),
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let row = message.clone();
    uploads::insert_or_discard(&state, std::slice::from_ref(&upload), move || db.insert_message(&row))
        .await?;

    info!("Message {} uploaded", message.id);
    state
        .dispatcher
        .broadcast(ChangeEvent::inserted(Table::Messages, &message));

    Ok((StatusCode::CREATED, Json(message)))
}
