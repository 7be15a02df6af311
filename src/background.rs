//! Background removal.
//!
//! Removal is an optional first stage: when it fails for any reason the
//! pipeline keeps the original bytes. [`BackgroundRemover`] is the seam; the
//! shipped [`HttpBackgroundRemover`] posts the image to a configured service
//! and expects the stripped image back.

use crate::config::BackgroundConfig;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemovalError {
    #[error("background removal is enabled but no endpoint is configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("service returned an empty image")]
    EmptyBody,
}

pub trait BackgroundRemover: Sync {
    fn remove_background(&self, bytes: &[u8], mime_type: &str) -> Result<Vec<u8>, RemovalError>;
}

/// MIME type from the file extension; unknown extensions are sent as JPEG.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "image/jpeg",
    }
}

/// Run removal and fall back to `original` on any failure.
pub fn remove_or_keep(remover: &dyn BackgroundRemover, source: &Path, original: Vec<u8>) -> Vec<u8> {
    match remover.remove_background(&original, mime_type_for(source)) {
        Ok(stripped) => {
            tracing::debug!(source = %source.display(), bytes = stripped.len(), "background removed");
            stripped
        }
        Err(e) => {
            tracing::warn!(
                source = %source.display(),
                error = %e,
                "background removal failed, using original image"
            );
            original
        }
    }
}

/// Posts raw image bytes to an HTTP service.
pub struct HttpBackgroundRemover {
    client: Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl HttpBackgroundRemover {
    /// Build from config. The API key is read from the environment variable
    /// named by `api_key_env`, if set.
    pub fn from_config(config: &BackgroundConfig) -> Result<Self, RemovalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty());
        Ok(Self {
            client,
            endpoint: config.endpoint.clone().filter(|e| !e.trim().is_empty()),
            api_key,
        })
    }
}

impl BackgroundRemover for HttpBackgroundRemover {
    fn remove_background(&self, bytes: &[u8], mime_type: &str) -> Result<Vec<u8>, RemovalError> {
        let endpoint = self.endpoint.as_deref().ok_or(RemovalError::NotConfigured)?;

        let mut request = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, mime_type)
            .body(bytes.to_vec());
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemovalError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes()?;
        if body.is_empty() {
            return Err(RemovalError::EmptyBody);
        }
        Ok(body.to_vec())
    }
}
