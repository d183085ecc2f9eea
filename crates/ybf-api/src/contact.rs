use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use ybf_types::admin::{AdminAction, SessionClaims};
use ybf_types::api::{ContactRequest, ContactResponse};
use ybf_types::events::ChangeEvent;
use ybf_types::models::ContactSubmission;
use ybf_types::query::{ListQuery, Table};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiResult, required};
use crate::middleware::authorize;

/// POST /contact: stores the submission and returns prefilled links for the
/// client to open. Nothing is sent from the server.
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> ApiResult<impl IntoResponse> {
    let submission = ContactSubmission {
        id: Uuid::new_v4(),
        name: required("name", &req.name)?,
        email: required("email", &req.email)?,
        message: required("message", &req.message)?,
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let row = submission.clone();
    blocking(move || db.insert_contact_submission(&row)).await?;

    state
        .dispatcher
        .broadcast(ChangeEvent::inserted(Table::ContactSubmissions, &submission));

    let settings = &state.settings;
    let response = ContactResponse {
        id: submission.id,
        mailto_url: mailto_url(&settings.contact_email, &submission),
        whatsapp_url: settings
            .whatsapp_number
            .as_deref()
            .map(|number| whatsapp_url(number, &submission)),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /admin/contact
pub async fn list_contact(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<Json<Vec<ContactSubmission>>> {
    authorize(&claims, AdminAction::Donations)?;

    let db = state.db.clone();
    let rows = blocking(move || db.list::<ContactSubmission>(&ListQuery::new(Table::ContactSubmissions)))
        .await?;
    Ok(Json(rows))
}

fn message_body(s: &ContactSubmission) -> String {
    format!("Name: {}\nEmail: {}\n\n{}", s.name, s.email, s.message)
}

pub fn mailto_url(to: &str, s: &ContactSubmission) -> String {
    let subject = format!("Website enquiry from {}", s.name);
    format!(
        "mailto:{}?subject={}&body={}",
        to,
        urlencoding::encode(&subject),
        urlencoding::encode(&message_body(s))
    )
}

pub fn whatsapp_url(number: &str, s: &ContactSubmission) -> String {
    format!(
        "https://wa.me/{}?text={}",
        number,
        urlencoding::encode(&message_body(s))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            id: Uuid::new_v4(),
            name: "Ada Obi".into(),
            email: "ada@example.com".into(),
            message: "Can I volunteer & help?".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn mailto_is_percent_encoded() {
        let url = mailto_url("info@youngbuildersfoundation.org", &submission());
        assert!(url.starts_with("mailto:info@youngbuildersfoundation.org?subject=Website%20enquiry%20from%20Ada%20Obi&body="));
        assert!(url.contains("volunteer%20%26%20help%3F"));
        assert!(!url.contains('\n'));
    }

    #[test]
    fn whatsapp_link_targets_number() {
        let url = whatsapp_url("2348012345678", &submission());
        assert!(url.starts_with("https://wa.me/2348012345678?text=Name%3A%20Ada%20Obi"));
    }
}
