//! JSON API handlers. Every route here requires a signed-in identity.

pub mod account;
pub mod catalog;
pub mod ledger;
pub mod uploads;

use axum::{Json, extract::rejection::JsonRejection};

use crate::error::{AppError, Result};

/// Unwrap a JSON body, turning extractor rejections into a `400` with a
/// `{success: false}` body instead of axum's plain-text default.
pub(crate) fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}
