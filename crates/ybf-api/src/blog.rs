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
use ybf_types::api::{AddCommentRequest, CreateBlogPostRequest};
use ybf_types::events::ChangeEvent;
use ybf_types::models::{BlogComment, BlogPost, Bucket};
use ybf_types::query::{Filter, ListQuery, Table};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult, required};
use crate::middleware::authorize;
use crate::uploads;

/// Blog images share the gallery bucket under this prefix.
const IMAGE_PREFIX: &str = "blog";

pub async fn list_posts(State(state): State<AppState>) -> ApiResult<Json<Vec<BlogPost>>> {
    let db = state.db.clone();
    let rows = blocking(move || db.list::<BlogPost>(&ListQuery::new(Table::BlogPosts))).await?;
    Ok(Json(rows))
}

/// POST /admin/blog/posts, with an optional cover image normalized to JPEG.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(req): Json<CreateBlogPostRequest>,
) -> ApiResult<impl IntoResponse> {
    authorize(&claims, AdminAction::BlogCreate)?;

    let title = required("title", &req.title)?;
    let content = required("content", &req.content)?;
    let author_name = required("author_name", &req.author_name)?;

    let mut uploaded = Vec::new();
    if let Some(image) = &req.image {
        let jpeg = uploads::jpeg_from_upload("image", image).await?;
        let key = uploads::image_key(IMAGE_PREFIX, &image.file_name);
        uploaded.push(uploads::store_jpeg(&state, Bucket::Gallery, key, &jpeg).await?);
    }

    let post = BlogPost {
        id: Uuid::new_v4(),
        title,
        content,
        author_name,
        image_url: uploaded.first().map(|u| u.url.clone()),
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let row = post.clone();
    uploads::insert_or_discard(&state, &uploaded, move || db.insert_blog_post(&row)).await?;

    info!("Blog post {} published", post.id);
    state
        .dispatcher
        .broadcast(ChangeEvent::inserted(Table::BlogPosts, &post));

    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /blog/posts/{id}/comments, oldest first.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<Vec<BlogComment>>> {
    let db = state.db.clone();
    let rows = blocking(move || {
        if db.get::<BlogPost>(post_id)?.is_none() {
            return Ok(None);
        }
        let query =
            ListQuery::new(Table::BlogComments).filter(Filter::eq("post_id", post_id.to_string()));
        db.list::<BlogComment>(&query).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("blog post"))?;
    Ok(Json(rows))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let comment = BlogComment {
        id: Uuid::new_v4(),
        post_id,
        name: required("name", &req.name)?,
        comment: required("comment", &req.comment)?,
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let row = comment.clone();
    let inserted = blocking(move || {
        if db.get::<BlogPost>(post_id)?.is_none() {
            return Ok(false);
        }
        db.insert_blog_comment(&row)?;
        Ok(true)
    })
    .await?;
    if !inserted {
        return Err(ApiError::NotFound("blog post"));
    }

    state
        .dispatcher
        .broadcast(ChangeEvent::inserted(Table::BlogComments, &comment));

    Ok((StatusCode::CREATED, Json(comment)))
}
