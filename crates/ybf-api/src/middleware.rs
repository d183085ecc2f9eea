use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use ybf_types::admin::{AdminAction, SessionClaims};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// Extract and validate the admin session from the Authorization header.
/// The claims are handed to the handler, which checks the scope it needs.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.sessions.verify(token.trim()).ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// A session only opens the endpoints of the action it was issued for.
pub fn authorize(claims: &SessionClaims, action: AdminAction) -> ApiResult<()> {
    if claims.scope() == Some(action) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_must_match() {
        let claims = SessionClaims {
            sub: "qa_answers".into(),
            iat: 0,
            exp: usize::MAX,
        };
        assert!(authorize(&claims, AdminAction::QaAnswers).is_ok());
        assert!(matches!(
            authorize(&claims, AdminAction::Announcement),
            Err(ApiError::Forbidden(AdminAction::Announcement))
        ));
    }
}
