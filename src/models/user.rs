//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User account stored in Firestore.
///
/// The document ID is `id`. The password is only ever stored as an
/// Argon2id PHC string; the cleartext never reaches this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID v4, also used as document ID
    pub id: String,
    /// Unique username, stored lowercase
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Display name
    pub fullname: String,
    /// Argon2id PHC hash of the password
    pub password_hash: String,
    /// Avatar image URL
    pub avatar: String,
    /// Cover image URL (empty string when none was uploaded)
    pub cover_image: String,
    /// Currently valid refresh token, if any.
    /// Overwriting or clearing this field revokes all outstanding
    /// refresh tokens for the account.
    pub refresh_token: Option<String>,
    /// When the account was created (RFC 3339)
    pub created_at: String,
}

/// Fields for creating a new user record.
///
/// Carries the cleartext password; the store adapter hashes it while
/// persisting, so the hash never has to round-trip through handlers.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password: String,
    pub avatar: String,
    pub cover_image: String,
}

/// User projection safe to return in API responses.
///
/// Excludes `password_hash` and `refresh_token`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            fullname: user.fullname,
            avatar: user.avatar,
            cover_image: user.cover_image,
            created_at: user.created_at,
        }
    }
}
