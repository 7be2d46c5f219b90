// SPDX-License-Identifier: MIT

//! Session token service.
//!
//! Issues and verifies two classes of HS256 JWTs bound to a user ID:
//! short-lived access tokens and longer-lived refresh tokens, signed with
//! distinct secrets. The service itself is stateless; callers persist the
//! refresh token onto the user record to make revocation possible.

use crate::config::Config;
use crate::error::AppError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Access token lifetime: 1 day.
pub const ACCESS_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
/// Refresh token lifetime: 10 days.
pub const REFRESH_TOKEN_TTL_SECS: u64 = 10 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// An access/refresh token pair for one user.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies session tokens.
///
/// Signing keys are injected at construction and read-only afterwards.
#[derive(Clone)]
pub struct TokenService {
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
        }
    }

    /// Issue a fresh access/refresh pair for a user.
    ///
    /// The caller is responsible for persisting the refresh token onto the
    /// user record.
    pub fn issue_pair(&self, user_id: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: sign(&self.access_secret, user_id, ACCESS_TOKEN_TTL_SECS)?,
            refresh_token: sign(&self.refresh_secret, user_id, REFRESH_TOKEN_TTL_SECS)?,
        })
    }

    /// Verify an access token, returning the user ID it was issued for.
    pub fn verify_access(&self, token: &str) -> Result<String, AppError> {
        verify(&self.access_secret, token)
    }

    /// Verify a refresh token's signature and expiry, returning the user ID.
    ///
    /// Callers must additionally compare the token against the value stored
    /// on the user record; a signature check alone cannot revoke.
    pub fn verify_refresh(&self, token: &str) -> Result<String, AppError> {
        verify(&self.refresh_secret, token)
    }
}

fn sign(secret: &[u8], user_id: &str, ttl_secs: u64) -> Result<String, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_secs as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Token signing failed: {}", e)))
}

/// Decode and validate a token. Missing, malformed, signature-invalid and
/// expired tokens all map to the same `Unauthorized` error.
fn verify(secret: &[u8], token: &str) -> Result<String, AppError> {
    let key = DecodingKey::from_secret(secret);
    let validation = Validation::new(Algorithm::HS256);

    let token_data =
        decode::<Claims>(token, &key, &validation).map_err(|_| AppError::Unauthorized)?;

    Ok(token_data.claims.sub)
}
