use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Question;

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Admin gate --

#[derive(Debug, Deserialize, Serialize)]
pub struct VerifyAdminPasswordRequest {
    pub password: String,
    pub action: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VerifyAdminPasswordResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// -- Uploads --

/// A file carried inline in a JSON body.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UploadFile {
    pub file_name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Base64 (standard alphabet) file contents.
    pub data: String,
}

// -- Announcements --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub content: String,
}

// -- Questions --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitQuestionRequest {
    pub name: String,
    pub email: String,
    pub question: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnswerQuestionRequest {
    pub answer: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EditQuestionRequest {
    pub question: String,
}

/// Admin view of the Q&A inbox.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionBoard {
    pub unanswered: Vec<Question>,
    pub answered: Vec<Question>,
}

/// Answered question as shown on the public page, without the asker's email.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub name: String,
    pub question: String,
    pub answer: Option<String>,
    pub answered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            name: q.name,
            question: q.question,
            answer: q.answer,
            answered_at: q.answered_at,
            created_at: q.created_at,
        }
    }
}

// -- Testimonies --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitTestimonyRequest {
    pub name: String,
    pub testimony: String,
    /// Falls back to the server's auto-approve setting when absent.
    #[serde(default)]
    pub approved: Option<bool>,
}

// -- Blog --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBlogPostRequest {
    pub title: String,
    pub content: String,
    pub author_name: String,
    #[serde(default)]
    pub image: Option<UploadFile>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AddCommentRequest {
    pub name: String,
    pub comment: String,
}

// -- Books --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: Option<String>,
    pub cover: UploadFile,
    pub file: UploadFile,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AddReviewRequest {
    pub user_name: String,
    pub review: String,
    #[serde(default)]
    pub rating: Option<i64>,
}

// -- Gallery --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGalleryImageRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub image: UploadFile,
}

// -- Messages --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub title: String,
    pub date: String,
    pub audio: UploadFile,
}

// -- Donations --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDonationRequest {
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub amount: f64,
    pub payment_method: String,
}

// -- Contact --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Links the client opens after a contact submission. Nothing is sent by
/// the server itself.
#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub mailto_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_url: Option<String>,
}
