//! Forwards a single file to an internal upload endpoint.

use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context, Result};
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Response header naming the file as stored by the upload endpoint.
pub const FILENAME_HEADER: &str = "x-filename";

/// Multipart field name the upload endpoint reads.
pub const FILE_FIELD: &str = "file";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Response body, as text.
    pub body: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload failed with HTTP status {0}")]
    Status(StatusCode),

    #[error("Upload request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone, Debug)]
pub struct UploadRelay {
    http: Client,
    endpoint: Url,
}

impl UploadRelay {
    /// # Errors
    /// Returns an error if `endpoint` is not an absolute http(s) URL or the
    /// HTTP client cannot be built.
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("Invalid upload URL: {endpoint}"))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(anyhow!(
                "Upload URL must use http or https: {endpoint}"
            ));
        }
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("Failed to build upload HTTP client")?;
        Ok(Self { http, endpoint })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Post `file` as the only part of a multipart form.
    /// # Errors
    /// [`UploadError::Status`] for a non-success reply, [`UploadError::Transport`]
    /// when the endpoint could not be reached or read.
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn relay(&self, file: UploadFile) -> Result<UploadReceipt, UploadError> {
        let mut part = Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(content_type) = file.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status));
        }

        let file_name = response
            .headers()
            .get(FILENAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        debug!(?file_name, "upload relayed");

        Ok(UploadReceipt { body, file_name })
    }
}
