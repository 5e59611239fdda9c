//! Session middleware configuration.
//!
//! Sessions hold only the signed-in identity and the OIDC handshake values.
//! Production uses the `PostgreSQL` store from `tower-sessions-sqlx-store`.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::MonanceConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "monance_session";

/// Session expiry time in seconds (7 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// The `PostgreSQL` session store.
///
/// The `tower_sessions.session` table is created by `monance-cli migrate`.
#[must_use]
pub fn postgres_session_store(pool: &PgPool) -> PostgresStore {
    PostgresStore::new(pool.clone())
}

/// Create the session layer over any session store.
///
/// Cookies are `HttpOnly`, `SameSite=Lax`, and `Secure` when the public URL
/// is https.
#[must_use]
pub fn create_session_layer<Store: SessionStore + Clone>(
    store: Store,
    config: &MonanceConfig,
) -> SessionManagerLayer<Store> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
