//! HTTP route handlers for the ledger API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! GET  /sign-in                - Redirect to the identity provider
//! GET  /auth/callback          - Handle the OIDC callback
//! POST /sign-out               - Clear the session and log out at the provider
//!
//! # Account (requires auth)
//! GET  /api/me                 - Get-or-create the caller's record
//! GET  /api/dashboard          - Balances, verification and recent entries
//! GET  /api/history            - Full ledger history
//!
//! # Ledger (requires auth)
//! POST /api/deposits           - Record a deposit awaiting confirmation
//! POST /api/withdrawals        - Record a withdrawal awaiting confirmation
//! POST /api/kyc                - Submit an identity document for verification
//! POST /api/uploads            - Upload a receipt or document (multipart)
//!
//! # Catalogues (requires auth)
//! GET  /api/wallets            - Deposit wallet addresses
//! GET  /api/plans              - Investment plan tiers
//! GET  /api/badges             - Badge status for the caller
//! GET  /api/referrals          - Referral link and commission levels
//! ```
//!
//! Anything else gets a JSON `404`.
//!
//! Health endpoints live in `main.rs` because they need the concrete pool.

pub mod api;
pub mod auth;

use axum::{
    Router,
    extract::{DefaultBodyLimit, OriginalUri},
    routing::{get, post},
};

use crate::db::UserStore;
use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::services::upload::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Slack on top of the file size for multipart framing and other fields.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the sign-in / sign-out routes router.
pub fn auth_routes<S: UserStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/sign-in", get(auth::sign_in::<S>))
        .route("/auth/callback", get(auth::callback::<S>))
        .route("/sign-out", post(auth::sign_out::<S>))
}

/// Create the JSON API routes router (nested under `/api`).
pub fn api_routes<S: UserStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/me", get(api::account::me::<S>))
        .route("/dashboard", get(api::account::dashboard::<S>))
        .route("/history", get(api::account::history::<S>))
        .route("/deposits", post(api::ledger::deposit::<S>))
        .route("/withdrawals", post(api::ledger::withdrawal::<S>))
        .route("/kyc", post(api::ledger::kyc::<S>))
        .route(
            "/uploads",
            post(api::uploads::upload::<S>)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/wallets", get(api::catalog::wallets::<S>))
        .route("/plans", get(api::catalog::plans))
        .route("/badges", get(api::catalog::badges::<S>))
        .route("/referrals", get(api::catalog::referrals::<S>))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(uri.path().to_owned())
}

/// Create the application routes router without rate limiting.
pub fn routes<S: UserStore>() -> Router<AppState<S>> {
    Router::new()
        .merge(auth_routes())
        .nest("/api", api_routes())
        .fallback(not_found)
}

/// Create the application routes router with per-group rate limiting.
///
/// The limiters key on the client IP, so the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`. Proxy-supplied
/// client IP headers are used only when `trust_proxy_headers` is set.
pub fn limited_routes<S: UserStore>(trust_proxy_headers: bool) -> Router<AppState<S>> {
    Router::new()
        .merge(auth_routes().layer(auth_rate_limiter(trust_proxy_headers)))
        .nest(
            "/api",
            api_routes().layer(api_rate_limiter(trust_proxy_headers)),
        )
        .fallback(not_found)
}
