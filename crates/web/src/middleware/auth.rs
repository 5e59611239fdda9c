//! Authentication extractors.
//!
//! Provides extractors for requiring a signed-in identity in route handlers.

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentIdentity, Submission, keys};

/// Extractor that requires a signed-in identity.
///
/// If nobody is signed in, HTML requests are redirected to `/sign-in` and
/// `/api` requests get a `401`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireIdentity(identity): RequireIdentity,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", identity.display_name)
/// }
/// ```
pub struct RequireIdentity(pub CurrentIdentity);

/// Error returned when a signed-in identity is required but missing.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// Redirect to sign-in (for HTML requests).
    RedirectToSignIn,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToSignIn => Redirect::to("/sign-in").into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(Submission::failed("Sign in required")),
            )
                .into_response(),
        }
    }
}

fn rejection_for(path: &str) -> AuthRejection {
    if path == "/api" || path.starts_with("/api/") {
        AuthRejection::Unauthorized
    } else {
        AuthRejection::RedirectToSignIn
    }
}

/// Rejection for the request as the client sent it.
///
/// Nested routers strip their prefix from `parts.uri`, so the full path
/// comes from [`OriginalUri`] when the router recorded one.
fn rejection_for_parts(parts: &Parts) -> AuthRejection {
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |original| original.0.path());
    rejection_for(path)
}

impl<S> FromRequestParts<S> for RequireIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let Some(session) = parts.extensions.get::<Session>() else {
            return Err(rejection_for_parts(parts));
        };

        let identity: CurrentIdentity = session
            .get(keys::CURRENT_IDENTITY)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| rejection_for_parts(parts))?;

        Ok(Self(identity))
    }
}

/// Extractor that optionally gets the current identity.
///
/// Unlike `RequireIdentity`, this does not reject the request if nobody is
/// signed in.
pub struct OptionalIdentity(pub Option<CurrentIdentity>);

impl<S> FromRequestParts<S> for OptionalIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentIdentity>(keys::CURRENT_IDENTITY)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(identity))
    }
}

/// Helper to set the current identity in the session.
///
/// Cycles the session id first so a pre-sign-in id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_identity(
    session: &Session,
    identity: &CurrentIdentity,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_IDENTITY, identity).await
}

/// Helper to clear the current identity from the session (sign-out).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_identity(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentIdentity>(keys::CURRENT_IDENTITY)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_depends_on_path() {
        assert_eq!(rejection_for("/api/me"), AuthRejection::Unauthorized);
        assert_eq!(rejection_for("/api"), AuthRejection::Unauthorized);
        assert_eq!(rejection_for("/dashboard"), AuthRejection::RedirectToSignIn);
        assert_eq!(rejection_for("/apiary"), AuthRejection::RedirectToSignIn);
    }

    #[test]
    fn test_rejection_uses_original_uri_under_nest() {
        let (mut parts, ()) = axum::http::Request::get("/me")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(rejection_for_parts(&parts), AuthRejection::RedirectToSignIn);

        parts
            .extensions
            .insert(OriginalUri("/api/me".parse().unwrap()));
        assert_eq!(rejection_for_parts(&parts), AuthRejection::Unauthorized);
    }

    #[test]
    fn test_rejection_responses() {
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthRejection::RedirectToSignIn.into_response().status(),
            StatusCode::SEE_OTHER
        );
    }
}
