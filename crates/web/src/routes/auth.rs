//! OIDC sign-in route handlers.
//!
//! - Sign-in: store `state` and `nonce` in the session, redirect to the provider
//! - Callback: check `state`, exchange the code, resolve the identity
//! - Sign-out: clear the session identity and redirect to the provider logout

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::db::UserStore;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalIdentity, clear_current_identity, set_current_identity};
use crate::models::{CurrentIdentity, keys};
use crate::services::IdentityError;
use crate::services::identity::random_token;
use crate::state::AppState;

/// Where a signed-in browser lands.
pub const AFTER_SIGN_IN: &str = "/api/me";

/// Query parameters on the provider's redirect back to us.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Start sign-in.
///
/// # Route
///
/// `GET /sign-in`
pub async fn sign_in<S: UserStore>(
    State(state): State<AppState<S>>,
    OptionalIdentity(current): OptionalIdentity,
    session: Session,
) -> Result<Response> {
    if current.is_some() {
        return Ok(Redirect::to(AFTER_SIGN_IN).into_response());
    }

    let oidc_state = random_token();
    let nonce = random_token();
    session.insert(keys::OIDC_STATE, &oidc_state).await?;
    session.insert(keys::OIDC_NONCE, &nonce).await?;

    let url = state.identity().authorization_url(
        &state.config().callback_url(),
        &oidc_state,
        &nonce,
    );
    Ok(Redirect::to(&url).into_response())
}

/// Finish sign-in.
///
/// # Route
///
/// `GET /auth/callback`
pub async fn callback<S: UserStore>(
    State(state): State<AppState<S>>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    if let Some(error) = query.error {
        tracing::warn!(
            error = %error,
            description = query.error_description.as_deref().unwrap_or_default(),
            "Identity provider denied sign-in"
        );
        return Err(AppError::Unauthorized("Sign-in was cancelled".to_owned()));
    }

    let Some(code) = query.code else {
        return Err(AppError::BadRequest("Missing authorization code".to_owned()));
    };

    // One-time use
    let stored_state: Option<String> = session.remove(keys::OIDC_STATE).await?;
    session.remove::<String>(keys::OIDC_NONCE).await?;
    if stored_state.is_none() || stored_state != query.state {
        tracing::warn!("OIDC state mismatch");
        return Err(IdentityError::StateMismatch.into());
    }

    let redirect_uri = state.config().callback_url();
    let tokens = state
        .identity()
        .exchange_code(&code, &redirect_uri)
        .await?;
    let resolved = state.identity().userinfo(&tokens).await?;

    let current = CurrentIdentity {
        identity_id: resolved.identity_id,
        display_name: resolved.display_name,
    };
    set_current_identity(&session, &current).await?;
    if let Some(id_token) = &tokens.id_token {
        session.insert(keys::ID_TOKEN, id_token).await?;
    }

    state.ledger().get_or_create_user(&current.context()).await?;
    set_sentry_user(&current.identity_id, Some(&current.display_name));
    tracing::info!(identity = %current.identity_id, "Signed in");

    Ok(Redirect::to(AFTER_SIGN_IN).into_response())
}

/// Sign out locally and at the provider.
///
/// # Route
///
/// `POST /sign-out`
pub async fn sign_out<S: UserStore>(
    State(state): State<AppState<S>>,
    session: Session,
) -> Result<Response> {
    let id_token: Option<String> = session.remove(keys::ID_TOKEN).await?;
    clear_current_identity(&session).await?;
    clear_sentry_user();

    let post_logout = format!("{}/", state.config().base_url);
    let url = state
        .identity()
        .logout_url(id_token.as_deref(), &post_logout);
    Ok(Redirect::to(&url).into_response())
}
