//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and held in memory; nothing re-reads
//! the environment after boot.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed for credentialed CORS requests
    pub frontend_url: String,
    /// GCP project ID for Firestore
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Base URL of the media store upload API
    pub media_api_url: String,
    /// Directory where multipart file uploads are staged before upload
    pub upload_dir: PathBuf,

    // --- Secrets ---
    /// Media store API key
    pub media_api_key: String,
    /// Signing key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// Signing key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            media_api_url: "https://media.test".to_string(),
            upload_dir: env::temp_dir().join("clipstream-uploads"),
            media_api_key: "test_media_key".to_string(),
            access_token_secret: b"test_access_key_32_bytes_minimum".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimu".to_vec(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development. In production the
    /// secrets are injected as environment variables by the deployment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            // Non-sensitive config from env
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            media_api_url: env::var("MEDIA_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "https://media.clipstream.dev".to_string()),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("clipstream-uploads")),

            // Secrets
            media_api_key: env::var("MEDIA_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MEDIA_API_KEY"))?,
            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?
                .into_bytes(),
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?
                .into_bytes(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("MEDIA_API_KEY", "test_media_key");
        env::set_var("ACCESS_TOKEN_SECRET", "test_access_key_32_bytes_minimum");
        env::set_var("REFRESH_TOKEN_SECRET", "test_refresh_key_32_bytes_minimu");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.media_api_key, "test_media_key");
        assert_eq!(
            config.access_token_secret,
            b"test_access_key_32_bytes_minimum".to_vec()
        );
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_distinct_default_secrets() {
        let config = Config::default();
        assert_ne!(config.access_token_secret, config.refresh_token_secret);
    }
}
