// SPDX-License-Identifier: MIT

//! Media store client for uploading staged files.
//!
//! Takes a path to a file already staged on local disk, uploads it to the
//! remote media store, and returns the durable public URL. Any transport
//! or service failure yields an absent result rather than an error, so
//! callers choose their own fallback policy.

use crate::config::Config;
use crate::error::AppError;
use serde::Deserialize;
use std::path::Path;

/// Media store API client.
#[derive(Clone)]
pub struct MediaService {
    http: Option<reqwest::Client>,
    base_url: String,
    api_key: String,
}

/// Upload response from the media store.
#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

impl MediaService {
    /// Create a new media client from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            http: Some(reqwest::Client::new()),
            base_url: config.media_api_url.clone(),
            api_key: config.media_api_key.clone(),
        }
    }

    /// Create a mock media client for testing (offline mode).
    ///
    /// Uploads resolve to deterministic URLs without any network traffic.
    /// Only available in debug/test builds.
    #[cfg(debug_assertions)]
    pub fn new_mock() -> Self {
        Self {
            http: None,
            base_url: "https://media.test".to_string(),
            api_key: "mock".to_string(),
        }
    }

    /// Upload a staged local file, returning its public URL.
    ///
    /// Returns `None` on any failure (unreadable file, transport error,
    /// non-success status). Failures are logged but never raised.
    pub async fn upload(&self, local_path: &Path) -> Option<String> {
        let file_name = local_path.file_name()?.to_string_lossy().into_owned();

        // Mock mode (debug builds only)
        #[cfg(debug_assertions)]
        {
            if self.http.is_none() {
                return Some(format!("{}/{}", self.base_url, file_name));
            }
        }

        let client = self.http.as_ref()?;

        match self.try_upload(client, local_path, &file_name).await {
            Ok(url) => {
                tracing::info!(file = %file_name, url = %url, "Media upload complete");
                Some(url)
            }
            Err(err) => {
                tracing::warn!(
                    file = %file_name,
                    error = %err,
                    "Media upload failed"
                );
                None
            }
        }
    }

    async fn try_upload(
        &self,
        client: &reqwest::Client,
        local_path: &Path,
        file_name: &str,
    ) -> Result<String, AppError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| AppError::MediaApi(format!("Failed to read staged file: {}", e)))?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = client
            .post(format!("{}/upload", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::MediaApi(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::MediaApi(format!(
                "Upload returned status {}",
                response.status()
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::MediaApi(e.to_string()))?;

        Ok(uploaded.url)
    }
}
