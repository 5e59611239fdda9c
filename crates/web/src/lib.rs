//! Monance web library.
//!
//! This crate provides the ledger API as a library, allowing it to be
//! tested against the in-memory store and reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::db::UserStore;
use crate::middleware::{create_session_layer, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Wrap a routes router in the shared middleware stack and attach state.
///
/// Layers, outermost first: trace, request id, security headers, session.
/// Sentry layers are added by the binary on top of this.
pub fn app<S, Store>(routes: Router<AppState<S>>, state: AppState<S>, session_store: Store) -> Router
where
    S: UserStore,
    Store: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    routes
        .layer(session_layer)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
