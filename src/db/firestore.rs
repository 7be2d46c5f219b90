// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! The single source of truth for user accounts. Provides identity
//! lookups (username or email), account creation, and field-masked
//! refresh-token writes used for session revocation.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{NewUser, User};
use crate::services::password;
use serde::{Deserialize, Serialize};

/// Field-masked write target for the refresh-token column.
///
/// Only the masked field reaches Firestore, so session writes never touch
/// the rest of the user document.
#[derive(Serialize, Deserialize)]
struct RefreshTokenPatch {
    refresh_token: Option<String>,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // ExternalJwtFunctionSource provides a dummy token without needing a
        // custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document ID.
    pub async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by username or email, whichever matches first.
    ///
    /// Usernames are stored lowercase, so the lookup normalizes before
    /// querying.
    pub async fn find_user_by_identity(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        if let Some(username) = username {
            let needle = username.to_lowercase();
            if let Some(user) = self.find_one_by_field("username", needle).await? {
                return Ok(Some(user));
            }
        }

        if let Some(email) = email {
            if let Some(user) = self.find_one_by_field("email", email.to_string()).await? {
                return Ok(Some(user));
            }
        }

        Ok(None)
    }

    async fn find_one_by_field(
        &self,
        field: &str,
        value: String,
    ) -> Result<Option<User>, AppError> {
        let field = field.to_string();
        let matches: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field(field.clone()).eq(value.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(matches.into_iter().next())
    }

    /// Create a new user account.
    ///
    /// The cleartext password is hashed here, as part of persistence, so
    /// no caller ever handles the stored hash. Uniqueness of username and
    /// email is enforced by lookup before insert; the insert itself also
    /// refuses to overwrite an existing document ID.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        if self
            .find_user_by_identity(Some(&new_user.username), Some(&new_user.email))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Username or email is already registered".to_string(),
            ));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: new_user.username.to_lowercase(),
            email: new_user.email,
            fullname: new_user.fullname,
            password_hash: password::hash_password(&new_user.password)?,
            avatar: new_user.avatar,
            cover_image: new_user.cover_image,
            refresh_token: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(&user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(user_id = %user.id, username = %user.username, "User created");

        Ok(user)
    }

    // ─── Session Token Operations ────────────────────────────────

    /// Persist the current refresh token for a user.
    ///
    /// Overwrites whatever token was stored before, so concurrent logins
    /// are last-write-wins and any older refresh token stops verifying.
    pub async fn set_refresh_token(&self, user_id: &str, token: &str) -> Result<(), AppError> {
        self.patch_refresh_token(user_id, Some(token.to_string()))
            .await
    }

    /// Clear the stored refresh token, revoking all outstanding refresh
    /// tokens for the user.
    pub async fn clear_refresh_token(&self, user_id: &str) -> Result<(), AppError> {
        self.patch_refresh_token(user_id, None).await
    }

    async fn patch_refresh_token(
        &self,
        user_id: &str,
        refresh_token: Option<String>,
    ) -> Result<(), AppError> {
        let patch = RefreshTokenPatch { refresh_token };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(User::{refresh_token}))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
