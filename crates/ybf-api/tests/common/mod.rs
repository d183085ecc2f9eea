#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use ybf_api::{AppState, AppStateInner, Settings, auth};
use ybf_db::Database;
use ybf_feed::Dispatcher;
use ybf_storage::ObjectStore;
use ybf_types::admin::AdminAction;

pub const PUBLIC_URL: &str = "http://ybf.test";
pub const SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(Settings::default()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let storage = Arc::new(
            ObjectStore::new(dir.path().join("storage"), PUBLIC_URL)
                .await
                .unwrap(),
        );
        let settings = Settings {
            public_url: PUBLIC_URL.into(),
            ..settings
        };
        let state = AppStateInner::new(db, storage, Dispatcher::new(), SECRET, settings);
        Self {
            app: ybf_api::router(state.clone()),
            state,
            dir,
        }
    }

    /// Same database and storage directory, served under another public base
    /// (a redeploy on a new domain).
    pub async fn rebased(&self, public_url: &str, settings: Settings) -> AppState {
        let storage = Arc::new(
            ObjectStore::new(self.dir.path().join("storage"), public_url)
                .await
                .unwrap(),
        );
        let settings = Settings {
            public_url: public_url.into(),
            ..settings
        };
        AppStateInner::new(self.state.db.clone(), storage, Dispatcher::new(), SECRET, settings)
    }

    /// Store a password for `action`.
    pub fn set_password(&self, action: AdminAction, password: &str) {
        auth::seed_passwords(&self.state.db, [(action, password.to_string())]).unwrap();
    }

    /// Store a password for `action` and log in through the gate.
    pub async fn admin_token(&self, action: AdminAction) -> String {
        let password = format!("pw-{}", action);
        self.set_password(action, &password);
        let (status, body) = self
            .json(
                Method::POST,
                "/functions/verify-admin-password",
                None,
                Some(json!({"password": password, "action": action.as_str()})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.app.clone().oneshot(req).await.unwrap()
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        Self::request(self.app.clone(), method, uri, token, body).await
    }

    /// JSON request against any router.
    pub async fn request(
        app: Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = body_bytes(resp).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.json(Method::GET, uri, None, None).await
    }

    /// Number of objects across all buckets and metadata rows.
    pub async fn object_counts(&self) -> (usize, usize) {
        let mut files = 0;
        for bucket in ybf_types::models::Bucket::ALL {
            files += self.state.storage.list(bucket).await.unwrap().len();
        }
        let rows = self
            .state
            .db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM storage_objects", [], |r| r.get::<_, i64>(0))?)
            })
            .unwrap();
        (files, rows as usize)
    }
}

pub async fn body_bytes(resp: Response) -> Bytes {
    resp.into_body().collect().await.unwrap().to_bytes()
}

pub fn upload(file_name: &str, content_type: Option<&str>, data: &[u8]) -> Value {
    json!({
        "file_name": file_name,
        "content_type": content_type,
        "data": B64.encode(data),
    })
}

pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 120, 200]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
        .unwrap();
    buf
}

/// Minimal ISO-BMFF header with a HEIC brand.
pub fn heic_bytes() -> Vec<u8> {
    let mut data = vec![0, 0, 0, 24];
    data.extend_from_slice(b"ftypheic");
    data.extend_from_slice(&[0; 16]);
    data
}
