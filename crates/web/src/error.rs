//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error renders as a JSON [`Submission`] with `success: false`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::Submission;
use crate::services::{IdentityError, LedgerError, UploadError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Ledger operation failed.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// File upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Identity provider interaction failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is our fault (reported to Sentry).
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Ledger(err) => matches!(err, LedgerError::Persistence(_)),
            Self::Upload(err) => !err.is_client_error(),
            Self::Identity(err) => !matches!(err, IdentityError::StateMismatch),
            Self::Internal(_) => true,
            Self::NotFound(_) | Self::Unauthorized(_) | Self::BadRequest(_) | Self::RateLimited => {
                false
            }
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Ledger(err) => match err {
                LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
                LedgerError::NotVerified => StatusCode::FORBIDDEN,
                LedgerError::InsufficientFunds { .. } | LedgerError::PreconditionFailed(_) => {
                    StatusCode::CONFLICT
                }
                LedgerError::NotFound => StatusCode::NOT_FOUND,
                LedgerError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Upload(err) => match err {
                UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                UploadError::Empty | UploadError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
                UploadError::Http(_) | UploadError::Api { .. } | UploadError::Parse(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::Identity(err) => match err {
                IdentityError::StateMismatch => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Never includes internal details.
    fn client_message(&self) -> String {
        match self {
            Self::Ledger(err) => err.user_message(),
            Self::Upload(err) if err.is_client_error() => err.to_string(),
            Self::Upload(_) => "Upload failed. Please try again.".to_string(),
            Self::Identity(IdentityError::StateMismatch) => {
                "Sign-in expired, please try again".to_string()
            }
            Self::Identity(_) => "Sign-in failed".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();
        (status, Json(Submission::failed(self.client_message()))).into_response()
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session: {err}"))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an identity.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(identity: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(identity.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("ledger", "Deposit submitted", Some(&[("amount", "250.00")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
