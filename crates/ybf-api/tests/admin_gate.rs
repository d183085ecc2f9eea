mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use common::{TestApp, body_bytes};
use ybf_api::Settings;
use ybf_types::admin::AdminAction;

const GATE: &str = "/functions/verify-admin-password";

#[tokio::test]
async fn matching_password_is_valid_and_issues_session() {
    let app = TestApp::new().await;
    app.set_password(AdminAction::Announcement, "letmein");

    let (status, body) = app
        .json(Method::POST, GATE, None, Some(json!({"password": "letmein", "action": "announcement"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert!(body["token"].is_string());
    assert!(body["expires_at"].is_string());
}

#[tokio::test]
async fn wrong_password_is_invalid() {
    let app = TestApp::new().await;
    app.set_password(AdminAction::Announcement, "letmein");

    let (status, body) = app
        .json(Method::POST, GATE, None, Some(json!({"password": "letme1n", "action": "announcement"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn unknown_or_unseeded_action_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(Method::POST, GATE, None, Some(json!({"password": "x", "action": "launch_rockets"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"valid": false, "message": "Invalid action"}));

    // known action, but no password row
    let (status, body) = app
        .json(Method::POST, GATE, None, Some(json!({"password": "x", "action": "donations"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid action");
}

#[tokio::test]
async fn malformed_gate_body_gets_the_gate_shape() {
    let app = TestApp::new().await;

    let req = Request::builder()
        .method(Method::POST)
        .uri(GATE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"password": "x""#))
        .unwrap();
    let resp = app.send(req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body, json!({"valid": false, "message": "Invalid request body"}));

    // well-formed JSON missing a field is refused the same way
    let (status, body) = app
        .json(Method::POST, GATE, None, Some(json!({"password": "x"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn attempts_beyond_budget_are_throttled() {
    let app = TestApp::with_settings(Settings {
        gate_attempts_per_minute: 2,
        ..Settings::default()
    })
    .await;
    app.set_password(AdminAction::QaAnswers, "right");

    for _ in 0..2 {
        let (status, _) = app
            .json(Method::POST, GATE, None, Some(json!({"password": "wrong", "action": "qa_answers"})))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app
        .json(Method::POST, GATE, None, Some(json!({"password": "right", "action": "qa_answers"})))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["valid"], false);
    assert_eq!(body["message"], "Too many attempts");

    // the budget is per action
    app.set_password(AdminAction::Announcement, "other");
    let (status, body) = app
        .json(Method::POST, GATE, None, Some(json!({"password": "other", "action": "announcement"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
}

#[tokio::test]
async fn admin_endpoints_require_a_session() {
    let app = TestApp::new().await;
    let create = json!({"title": "Camp", "content": "Saturday"});

    let (status, body) = app
        .json(Method::POST, "/admin/announcements", None, Some(create.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app
        .json(Method::POST, "/admin/announcements", Some("not-a-jwt"), Some(create))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_for_one_action_is_forbidden_elsewhere() {
    let app = TestApp::new().await;
    let qa = app.admin_token(AdminAction::QaAnswers).await;

    let (status, _) = app
        .json(
            Method::POST,
            "/admin/announcements",
            Some(&qa),
            Some(json!({"title": "Camp", "content": "Saturday"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.json(Method::GET, "/admin/donations", Some(&qa), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.json(Method::GET, "/admin/questions", Some(&qa), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn stored_passwords_are_hashed() {
    let app = TestApp::new().await;
    app.set_password(AdminAction::BooksUpload, "BOOKS");

    let row = app.state.db.get_admin_password("books_upload").unwrap().unwrap();
    assert_ne!(row.password_hash, "BOOKS");
    assert!(row.password_hash.starts_with("$argon2"));
}
