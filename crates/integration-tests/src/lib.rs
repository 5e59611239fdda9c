//! Integration tests for Monance.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p monance-integration-tests
//! ```
//!
//! Everything runs in-process against [`MemoryUserStore`] and an in-memory
//! session store; no database or network is needed.
//!
//! # Test Categories
//!
//! - `ledger_service` - Ledger rules and verification state machine
//! - `api_routes` - The axum router driven with `tower::ServiceExt::oneshot`

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use axum::{
    Router,
    body::Body,
    extract::Path,
    http::{Request, StatusCode, header},
    response::Response,
    routing::post,
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session};
use url::Url;

use monance_core::IdentityId;
use monance_web::config::{IdentityConfig, MonanceConfig, UploadConfig};
use monance_web::db::MemoryUserStore;
use monance_web::middleware::set_current_identity;
use monance_web::models::CurrentIdentity;
use monance_web::routes;
use monance_web::services::IdentityContext;
use monance_web::state::AppState;

/// A receipt URL that passes validation.
pub const RECEIPT_URL: &str = "https://ucarecdn.com/0f8e2a1c-4b5d-4e6f-8a7b-9c0d1e2f3a4b/";

/// A Bitcoin address that passes payout validation.
pub const BTC_ADDRESS: &str = "bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh";

/// Configuration pointing at hosts that are never contacted.
#[must_use]
pub fn test_config() -> MonanceConfig {
    MonanceConfig {
        database_url: SecretString::from("postgres://localhost/monance_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_owned(),
        session_secret: SecretString::from("k".repeat(48)),
        trust_proxy_headers: false,
        identity: IdentityConfig {
            issuer_url: Url::parse("https://id.securemonance.test").unwrap(),
            client_id: "monance-web".to_owned(),
            client_secret: SecretString::from("integration-client-secret"),
        },
        upload: UploadConfig {
            public_key: "testpublickey".to_owned(),
            upload_url: Url::parse("https://upload.uploadcare.test").unwrap(),
            cdn_url: Url::parse("https://ucarecdn.test").unwrap(),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Identity context for a test user.
#[must_use]
pub fn ctx(identity: &str) -> IdentityContext {
    IdentityContext {
        identity_id: IdentityId::parse(identity).unwrap(),
        display_name: format!("{identity} name"),
    }
}

/// Whole dollars as a `Decimal`.
#[must_use]
pub fn dollars(amount: i64) -> Decimal {
    Decimal::new(amount, 0)
}

/// Test-only route that signs the given identity in.
async fn test_sign_in(session: Session, Path(identity): Path<String>) -> StatusCode {
    let current = CurrentIdentity {
        identity_id: IdentityId::parse(&identity).unwrap(),
        display_name: format!("{identity} name"),
    };
    set_current_identity(&session, &current).await.unwrap();
    StatusCode::NO_CONTENT
}

/// The router plus direct access to its state for operator actions.
pub struct TestApp {
    pub state: AppState<MemoryUserStore>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let state = AppState::new(test_config(), MemoryUserStore::new());
        let routes = routes::routes().route("/test/sign-in/{identity}", post(test_sign_in));
        let router = monance_web::app(routes, state.clone(), MemoryStore::default());
        Self { state, router }
    }

    /// Send a request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sign in and return the `Cookie` header value for the session.
    pub async fn sign_in(&self, identity: &str) -> String {
        let response = self
            .send(
                Request::post(format!("/test/sign-in/{identity}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        session_cookie(&response).unwrap()
    }

    /// `GET` a JSON endpoint.
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        json_response(self.send(builder.body(Body::empty()).unwrap()).await).await
    }

    /// `POST` a JSON body.
    pub async fn post_json(&self, uri: &str, cookie: Option<&str>, body: &Value) -> (StatusCode, Value) {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        json_response(self.send(request).await).await
    }
}

/// The `name=value` part of the session `Set-Cookie` header.
#[must_use]
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("monance_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_owned)
}

/// Status and parsed JSON body (`Value::Null` when the body is empty).
pub async fn json_response(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
