//! Uploadcare client for deposit receipts and identity documents.
//!
//! Files go to the Upload API's direct endpoint (`POST /base/`) with
//! `UPLOADCARE_STORE=auto`, and the returned file UUID is turned into a CDN
//! URL the browser can submit alongside a deposit or KYC request.

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::UploadConfig;

/// Largest file accepted, matching Uploadcare's direct-upload limit for
/// free projects.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const ACCEPTED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "application/pdf",
];

/// Errors that can occur when uploading a file.
#[derive(Debug, Error)]
pub enum UploadError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upload host rejected the file.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Upload host answered with something we could not use.
    #[error("Parse error: {0}")]
    Parse(String),

    /// No file in the request, or the file is empty.
    #[error("no file provided")]
    Empty,

    /// File exceeds [`MAX_UPLOAD_BYTES`].
    #[error("file is larger than {max} bytes")]
    TooLarge { max: usize },

    /// Content type is not an image or PDF.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
}

impl UploadError {
    /// Whether the caller sent a bad file, as opposed to the host failing.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Empty | Self::TooLarge { .. } | Self::UnsupportedType(_)
        )
    }
}

/// A file received from the browser, ready to forward.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Check size and type before anything leaves the server.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Empty`, `TooLarge`, or `UnsupportedType`.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge {
                max: MAX_UPLOAD_BYTES,
            });
        }
        if !ACCEPTED_TYPES.contains(&self.content_type.as_str()) {
            return Err(UploadError::UnsupportedType(self.content_type.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct BaseUploadResponse {
    file: String,
}

/// Uploadcare Upload API client.
#[derive(Clone)]
pub struct UploadClient {
    client: reqwest::Client,
    public_key: String,
    upload_url: Url,
    cdn_url: Url,
}

impl UploadClient {
    /// Create a new upload client.
    #[must_use]
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            public_key: config.public_key.clone(),
            upload_url: config.upload_url.clone(),
            cdn_url: config.cdn_url.clone(),
        }
    }

    /// Upload a file and return its content URL.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request is made, or
    /// `UploadError::Http`/`Api`/`Parse` if the upload host fails.
    pub async fn upload(&self, file: UploadFile) -> Result<Url, UploadError> {
        file.validate()?;

        let endpoint = self
            .upload_url
            .join("base/")
            .map_err(|e| UploadError::Parse(e.to_string()))?;

        let size = file.bytes.len();
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new()
            .text("UPLOADCARE_PUB_KEY", self.public_key.clone())
            .text("UPLOADCARE_STORE", "auto")
            .part("file", part);

        let response = self.client.post(endpoint).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: BaseUploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Parse(e.to_string()))?;

        let url = self.content_url(&body.file)?;
        tracing::info!(file = %body.file, size, "File uploaded");
        Ok(url)
    }

    /// CDN URL for an uploaded file UUID.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Parse` if the UUID is not a valid path segment.
    pub fn content_url(&self, file_id: &str) -> Result<Url, UploadError> {
        if file_id.is_empty() || !file_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(UploadError::Parse(format!("unexpected file id: {file_id}")));
        }
        self.cdn_url
            .join(&format!("{file_id}/"))
            .map_err(|e| UploadError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> UploadClient {
        UploadClient::new(&UploadConfig {
            public_key: "demopublickey".to_owned(),
            upload_url: Url::parse("https://upload.uploadcare.com").unwrap(),
            cdn_url: Url::parse("https://ucarecdn.com").unwrap(),
        })
    }

    fn file(content_type: &str, len: usize) -> UploadFile {
        UploadFile {
            file_name: "receipt.png".to_owned(),
            content_type: content_type.to_owned(),
            bytes: vec![0; len],
        }
    }

    #[test]
    fn test_content_url() {
        let url = client()
            .content_url("a8e5d6f0-1b2c-4d3e-9f40-5a6b7c8d9e0f")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ucarecdn.com/a8e5d6f0-1b2c-4d3e-9f40-5a6b7c8d9e0f/"
        );
    }

    #[test]
    fn test_content_url_rejects_path_tricks() {
        assert!(client().content_url("../admin").is_err());
        assert!(client().content_url("").is_err());
    }

    #[test]
    fn test_validate_file() {
        assert!(file("image/png", 10).validate().is_ok());
        assert!(file("application/pdf", 10).validate().is_ok());
        assert!(matches!(
            file("image/png", 0).validate(),
            Err(UploadError::Empty)
        ));
        assert!(matches!(
            file("text/html", 10).validate(),
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            file("image/png", MAX_UPLOAD_BYTES + 1).validate(),
            Err(UploadError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_response_parsing() {
        let body: BaseUploadResponse =
            serde_json::from_str(r#"{"file": "17be4678-dab7-4bc7-8753-28914a22960a"}"#).unwrap();
        assert_eq!(body.file, "17be4678-dab7-4bc7-8753-28914a22960a");
    }

    #[test]
    fn test_client_errors() {
        assert!(UploadError::Empty.is_client_error());
        assert!(
            !UploadError::Api {
                status: 500,
                message: String::new()
            }
            .is_client_error()
        );
    }
}
