//! Receipt and document upload handler.
//!
//! The browser sends one multipart `file` field; it is checked and forwarded
//! to the upload host, and the content URL comes back for use in a deposit
//! or KYC submission.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use serde::Serialize;

use crate::db::UserStore;
use crate::error::{AppError, Result};
use crate::middleware::RequireIdentity;
use crate::models::Submission;
use crate::services::upload::UploadFile;
use crate::state::AppState;

/// Name of the multipart field carrying the file.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub submission: Submission,
    pub url: String,
}

/// `POST /api/uploads`
pub async fn upload<S: UserStore>(
    State(state): State<AppState<S>>,
    RequireIdentity(identity): RequireIdentity,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let file = read_file_field(&mut multipart).await?;

    let size = file.bytes.len();
    let url = state.uploads().upload(file).await?;
    tracing::info!(
        identity = %identity.identity_id,
        size,
        url = %url,
        "File uploaded"
    );

    Ok(Json(UploadResponse {
        submission: Submission::ok("File uploaded."),
        url: url.to_string(),
    }))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<UploadFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_owned();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        return Ok(UploadFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::BadRequest("Missing file field".to_owned()))
}
