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
use ybf_types::api::{AddReviewRequest, CreateBookRequest};
use ybf_types::events::ChangeEvent;
use ybf_types::models::{Book, BookReview, Bucket};
use ybf_types::query::{Filter, ListQuery, Table};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult, optional, required};
use crate::middleware::authorize;
use crate::uploads::{self, Upload};

pub async fn list_books(State(state): State<AppState>) -> ApiResult<Json<Vec<Book>>> {
    let db = state.db.clone();
    let rows = blocking(move || db.list::<Book>(&ListQuery::new(Table::Books))).await?;
    Ok(Json(rows))
}

/// POST /admin/books: cover to `book-covers`, file to `book-files`, then the
/// row. Any failure after the first upload removes what was stored.
pub async fn create_book(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(req): Json<CreateBookRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize(&claims, AdminAction::BooksUpload)?;

    let title = required("title", &req.title)?;
    let author = required("author", &req.author)?;
    let description = optional(req.description.as_deref());
    let cover = uploads::decode_base64("cover", &req.cover)?;
    let file = uploads::decode_base64("file", &req.file)?;

    let cover_key = uploads::uuid_key(&req.cover.file_name);
    let cover_type = uploads::declared_content_type(&req.cover, &cover_key);
    let cover_upload = uploads::store(&state, Bucket::BookCovers, cover_key, &cover_type, &cover).await?;

    let file_key = uploads::uuid_key(&req.file.file_name);
    let file_type = uploads::declared_content_type(&req.file, &file_key);
    let file_upload = match uploads::store(&state, Bucket::BookFiles, file_key, &file_type, &file).await {
        Ok(upload) => upload,
        Err(e) => {
            uploads::discard(&state, std::slice::from_ref(&cover_upload)).await;
            return Err(e);
        }
    };

    let book = Book {
        id: Uuid::new_v4(),
        title,
        author,
        description,
        cover_image_url: cover_upload.url.clone(),
        file_url: file_upload.url.clone(),
        created_at: Utc::now(),
    };

    let stored: [Upload; 2] = [cover_upload, file_upload];
    let db = state.db.clone();
    let row = book.clone();
    uploads::insert_or_discard(&state, &stored, move || db.insert_book(&row)).await?;

    info!("Book {} added", book.id);
    state.dispatcher.broadcast(ChangeEvent::inserted(Table::Books, &book));

    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /books/{id}/reviews, latest first.
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
) -> ApiResult<Json<Vec<BookReview>>> {
    let db = state.db.clone();
    let rows = blocking(move || {
        if db.get::<Book>(book_id)?.is_none() {
            return Ok(None);
        }
        let query = ListQuery::new(Table::BookReviews).filter(Filter::eq("book_id", book_id.to_string()));
        db.list::<BookReview>(&query).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("book"))?;
    Ok(Json(rows))
}

pub async fn add_review(
    State(state): State<AppState>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<AddReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let rating = match req.rating {
        None => None,
        Some(r @ 1..=5) => Some(r as u8),
        Some(_) => return Err(ApiError::BadRequest("rating must be between 1 and 5".into())),
    };

    let review = BookReview {
        id: Uuid::new_v4(),
        book_id,
        user_name: required("user_name", &req.user_name)?,
        review: required("review", &req.review)?,
        rating,
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let row = review.clone();
    let inserted = blocking(move || {
        if db.get::<Book>(book_id)?.is_none() {
            return Ok(false);
        }
        db.insert_book_review(&row)?;
        Ok(true)
    })
    .await?;
    if !inserted {
        return Err(ApiError::NotFound("book"));
    }

    state
        .dispatcher
        .broadcast(ChangeEvent::inserted(Table::BookReviews, &review));

    Ok((StatusCode::CREATED, Json(review)))
}
