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
use ybf_types::api::CreateDonationRequest;
use ybf_types::events::ChangeEvent;
use ybf_types::models::{Donation, DonationStatus, PaymentMethod};
use ybf_types::query::{ListQuery, Table};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult, required};
use crate::middleware::authorize;

/// POST /donations: records the pledge. No payment is taken here.
pub async fn create_donation(
    State(state): State<AppState>,
    Json(req): Json<CreateDonationRequest>,
) -> ApiResult<impl IntoResponse> {
    if !req.amount.is_finite() || req.amount <= 0.0 {
        return Err(ApiError::BadRequest("amount must be greater than zero".into()));
    }
    let payment_method: PaymentMethod = req
        .payment_method
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("unknown payment method '{}'", req.payment_method)))?;

    let donation = Donation {
        id: Uuid::new_v4(),
        donor_name: required("donor_name", &req.donor_name)?,
        donor_email: required("donor_email", &req.donor_email)?,
        donor_phone: required("donor_phone", &req.donor_phone)?,
        amount: req.amount,
        payment_method,
        status: DonationStatus::initial_for(payment_method),
        transaction_reference: None,
        created_at: Utc::now(),
    };

    let db = state.db.clone();
    let row = donation.clone();
    blocking(move || db.insert_donation(&row)).await?;

    info!(
        "Donation {} recorded ({} via {})",
        donation.id,
        donation.amount,
        donation.payment_method.as_str()
    );
    state
        .dispatcher
        .broadcast(ChangeEvent::inserted(Table::Donations, &donation));

    Ok((StatusCode::CREATED, Json(donation)))
}

/// GET /admin/donations
pub async fn list_donations(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<Json<Vec<Donation>>> {
    authorize(&claims, AdminAction::Donations)?;

    let db = state.db.clone();
    let rows = blocking(move || db.list::<Donation>(&ListQuery::new(Table::Donations))).await?;
    Ok(Json(rows))
}
