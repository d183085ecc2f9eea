pub mod announcements;
pub mod auth;
pub mod blog;
pub mod books;
pub mod config;
pub mod contact;
pub mod donations;
pub mod error;
pub mod gallery;
pub mod messages;
pub mod middleware;
pub mod questions;
pub mod realtime;
pub mod storage;
pub mod sweep;
pub mod testimonies;
pub mod uploads;

use axum::{
    Json, Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

pub use auth::{AppState, AppStateInner};
pub use config::{Config, Settings};
pub use error::{ApiError, ApiResult};

/// Run blocking database work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// Every route of the service. Transport layers (CORS, tracing, body limit)
/// are added by the binary.
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/admin/announcements", post(announcements::create_announcement))
        .route("/admin/announcements/{id}", delete(announcements::delete_announcement))
        .route("/admin/questions", get(questions::question_board))
        .route("/admin/questions/{id}", put(questions::edit_question))
        .route("/admin/questions/{id}/answer", put(questions::answer_question))
        .route("/admin/blog/posts", post(blog::create_post))
        .route("/admin/books", post(books::create_book))
        .route("/admin/gallery", post(gallery::create_image))
        .route("/admin/gallery/{id}", delete(gallery::delete_image))
        .route("/admin/messages", post(messages::create_message))
        .route("/admin/donations", get(donations::list_donations))
        .route("/admin/contact", get(contact::list_contact))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .route("/functions/verify-admin-password", post(auth::verify_admin_password))
        .route("/announcements", get(announcements::list_announcements))
        .route("/questions", post(questions::submit_question))
        .route("/questions/answered", get(questions::list_answered))
        .route(
            "/testimonies",
            get(testimonies::list_testimonies).post(testimonies::submit_testimony),
        )
        .route("/blog/posts", get(blog::list_posts))
        .route(
            "/blog/posts/{id}/comments",
            get(blog::list_comments).post(blog::add_comment),
        )
        .route("/books", get(books::list_books))
        .route(
            "/books/{id}/reviews",
            get(books::list_reviews).post(books::add_review),
        )
        .route("/gallery", get(gallery::list_gallery))
        .route("/messages", get(messages::list_messages))
        .route("/donations", post(donations::create_donation))
        .route("/contact", post(contact::submit_contact))
        .route("/storage/{bucket}/{*key}", get(storage::download_object))
        .route("/realtime", get(realtime::realtime_ws))
        .route("/health", get(health))
        .merge(admin)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
