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
use ybf_types::api::{
    AnswerQuestionRequest, EditQuestionRequest, PublicQuestion, QuestionBoard,
    SubmitQuestionRequest,
};
use ybf_types::events::ChangeEvent;
use ybf_types::models::Question;
use ybf_types::query::{Filter, ListQuery, OrderBy, Table};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult, required};
use crate::middleware::authorize;

fn unanswered() -> ListQuery {
    ListQuery::new(Table::Questions).filter(Filter::is_null("answer"))
}

fn answered() -> ListQuery {
    ListQuery::new(Table::Questions)
        .filter(Filter::not_null("answer"))
        .order(OrderBy::desc("answered_at"))
}

/// POST /questions, from the public Q&A form.
pub async fn submit_question(
    State(state): State<AppState>,
    Json(req): Json<SubmitQuestionRequest>,
) -> ApiResult<impl IntoResponse> {
    let question = Question {
        id: Uuid::new_v4(),
        name: required("name", &req.name)?,
        email: required("email", &req.email)?,
        question: required("question", &req.question)?,
        answer: None,
        answered_at: None,
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let row = question.clone();
    blocking(move || db.insert_question(&row)).await?;

    state
        .dispatcher
        .broadcast(ChangeEvent::inserted(Table::Questions, &question));

    Ok((StatusCode::CREATED, Json(PublicQuestion::from(question))))
}

/// GET /questions/answered, most recently answered first, without emails.
pub async fn list_answered(State(state): State<AppState>) -> ApiResult<Json<Vec<PublicQuestion>>> {
    let db = state.db.clone();
    let rows = blocking(move || db.list::<Question>(&answered())).await?;
    Ok(Json(rows.into_iter().map(PublicQuestion::from).collect()))
}

/// GET /admin/questions
pub async fn question_board(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<Json<QuestionBoard>> {
    authorize(&claims, AdminAction::QaAnswers)?;

    let db = state.db.clone();
    let board = blocking(move || {
        Ok(QuestionBoard {
            unanswered: db.list::<Question>(&unanswered())?,
            answered: db.list::<Question>(&answered())?,
        })
    })
    .await?;
    Ok(Json(board))
}

/// PUT /admin/questions/{id}/answer. Answering again overwrites; concurrent
/// answers both succeed and the later one persists.
pub async fn answer_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<SessionClaims>,
    Json(req): Json<AnswerQuestionRequest>,
) -> ApiResult<Json<Question>> {
    authorize(&claims, AdminAction::QaAnswers)?;
    let answer = required("answer", &req.answer)?;

    let db = state.db.clone();
    let (before, after) = blocking(move || db.answer_question(id, &answer, Utc::now()))
        .await?
        .ok_or(ApiError::NotFound("question"))?;

    info!("Question {} answered", id);
    state
        .dispatcher
        .broadcast(ChangeEvent::updated(Table::Questions, &before, &after));

    Ok(Json(after))
}

/// PUT /admin/questions/{id}
pub async fn edit_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<SessionClaims>,
    Json(req): Json<EditQuestionRequest>,
) -> ApiResult<Json<Question>> {
    authorize(&claims, AdminAction::QaAnswers)?;
    let text = required("question", &req.question)?;

    let db = state.db.clone();
    let (before, after) = blocking(move || db.edit_question(id, &text))
        .await?
        .ok_or(ApiError::NotFound("question"))?;

    state
        .dispatcher
        .broadcast(ChangeEvent::updated(Table::Questions, &before, &after));

    Ok(Json(after))
}
