use std::num::NonZeroU32;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, error, info, warn};

use ybf_db::Database;
use ybf_feed::{Dispatcher, TokenVerifier};
use ybf_storage::ObjectStore;
use ybf_types::admin::{AdminAction, SessionClaims};
use ybf_types::api::{ErrorBody, VerifyAdminPasswordRequest, VerifyAdminPasswordResponse};

use crate::config::Settings;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub storage: Arc<ObjectStore>,
    pub dispatcher: Dispatcher,
    pub sessions: Arc<SessionKeys>,
    pub gate_limiter: DefaultKeyedRateLimiter<AdminAction>,
    pub settings: Settings,
}

impl AppStateInner {
    pub fn new(
        db: Arc<Database>,
        storage: Arc<ObjectStore>,
        dispatcher: Dispatcher,
        session_secret: &str,
        settings: Settings,
    ) -> AppState {
        let per_minute = NonZeroU32::new(settings.gate_attempts_per_minute).unwrap_or(NonZeroU32::MIN);
        Arc::new(Self {
            db,
            storage,
            dispatcher,
            sessions: Arc::new(SessionKeys::new(session_secret, settings.session_ttl)),
            gate_limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            settings,
        })
    }
}

/// Signs and checks action-scoped admin sessions (HS256).
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, action: AdminAction) -> anyhow::Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = SessionClaims {
            sub: action.as_str().to_string(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok((token, expires_at))
    }

    /// Claims of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding, &Validation::default())
            .ok()
            .map(|data| data.claims)
    }
}

impl TokenVerifier for SessionKeys {
    fn scope(&self, token: &str) -> Option<AdminAction> {
        self.verify(token)?.scope()
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("argon2 hash failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("stored password hash is malformed: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// POST /functions/verify-admin-password
///
/// Malformed body, unknown action or no stored password: 400. Wrong
/// password: 200 with `valid: false`. Right password: 200 with an
/// action-scoped session.
pub async fn verify_admin_password(
    State(state): State<AppState>,
    payload: Result<Json<VerifyAdminPasswordRequest>, JsonRejection>,
) -> Response {
    let refused = |status: StatusCode, message: &str| {
        let body = VerifyAdminPasswordResponse {
            message: Some(message.to_string()),
            ..Default::default()
        };
        (status, Json(body)).into_response()
    };

    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            debug!("Admin gate body rejected: {}", rejection.body_text());
            return refused(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    let Ok(action) = req.action.parse::<AdminAction>() else {
        return refused(StatusCode::BAD_REQUEST, "Invalid action");
    };

    if state.gate_limiter.check_key(&action).is_err() {
        warn!("Admin gate rate limit hit for {}", action);
        return refused(StatusCode::TOO_MANY_REQUESTS, "Too many attempts");
    }

    let db = state.db.clone();
    let password = req.password;
    let checked = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<bool>> {
        let Some(row) = db.get_admin_password(action.as_str())? else {
            return Ok(None);
        };
        verify_password(&password, &row.password_hash).map(Some)
    })
    .await
    .map_err(anyhow::Error::from)
    .and_then(|r| r);

    let issued = match checked {
        Ok(None) => return refused(StatusCode::BAD_REQUEST, "Invalid action"),
        Ok(Some(false)) => {
            info!("Admin gate rejected a password for {}", action);
            return Json(VerifyAdminPasswordResponse::default()).into_response();
        }
        Ok(Some(true)) => state.sessions.issue(action),
        Err(e) => Err(e),
    };

    match issued {
        Ok((token, expires_at)) => {
            info!("Admin session issued for {}", action);
            Json(VerifyAdminPasswordResponse {
                valid: true,
                token: Some(token),
                expires_at: Some(expires_at),
                message: None,
            })
            .into_response()
        }
        Err(e) => {
            error!("Admin gate failure for {}: {:#}", action, e);
            let body = ErrorBody {
                error: e.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Store a hash for every action whose `YBF_ADMIN_PASSWORD_<ACTION>` is set.
/// Existing hashes that already verify the configured password are kept.
pub fn seed_admin_passwords(db: &Database) -> anyhow::Result<usize> {
    let configured = AdminAction::ALL.into_iter().filter_map(|action| {
        std::env::var(action.password_env_var())
            .ok()
            .filter(|p| !p.is_empty())
            .map(|p| (action, p))
    });
    seed_passwords(db, configured)
}

pub fn seed_passwords(
    db: &Database,
    passwords: impl IntoIterator<Item = (AdminAction, String)>,
) -> anyhow::Result<usize> {
    let mut written = 0;
    for (action, password) in passwords {
        if let Some(row) = db.get_admin_password(action.as_str())? {
            if verify_password(&password, &row.password_hash).unwrap_or(false) {
                continue;
            }
        }
        db.set_admin_password(action.as_str(), &hash_password(&password)?)?;
        info!("Admin password set for {}", action);
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashes_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("S3cret", &hash).unwrap());
        assert!(verify_password("s3cret", "plaintext").is_err());
    }

    #[test]
    fn sessions_carry_their_scope() {
        let keys = SessionKeys::new("test-secret", chrono::Duration::minutes(5));
        let (token, expires_at) = keys.issue(AdminAction::BooksUpload).unwrap();
        assert!(expires_at > Utc::now());
        assert_eq!(keys.scope(&token), Some(AdminAction::BooksUpload));

        let other = SessionKeys::new("other-secret", chrono::Duration::minutes(5));
        assert_eq!(other.scope(&token), None);
        assert_eq!(keys.scope("garbage"), None);
    }

    #[test]
    fn expired_sessions_are_rejected() {
        let keys = SessionKeys::new("test-secret", chrono::Duration::minutes(-10));
        let (token, _) = keys.issue(AdminAction::Announcement).unwrap();
        assert!(keys.verify(&token).is_none());
    }

    #[test]
    fn seeding_is_idempotent_and_rotates() {
        let db = Database::open_in_memory().unwrap();
        let first = seed_passwords(&db, [(AdminAction::QaAnswers, "one".to_string())]).unwrap();
        assert_eq!(first, 1);
        let again = seed_passwords(&db, [(AdminAction::QaAnswers, "one".to_string())]).unwrap();
        assert_eq!(again, 0);
        let rotated = seed_passwords(&db, [(AdminAction::QaAnswers, "two".to_string())]).unwrap();
        assert_eq!(rotated, 1);

        let row = db.get_admin_password("qa_answers").unwrap().unwrap();
        assert!(verify_password("two", &row.password_hash).unwrap());
        assert!(!row.password_hash.contains("two"));
    }
}
