// SPDX-License-Identifier: MIT

//! Account and session routes.
//!
//! Registration (multipart with avatar/cover upload), password login
//! issuing an access/refresh token pair, refresh-token rotation, logout
//! with revocation, and the authenticated profile endpoint.

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::models::{NewUser, PublicUser};
use crate::services::password;
use crate::services::token::{ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};
use crate::uploads;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Registration bodies larger than this are rejected before staging.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Public account routes (no auth required).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/auth/register",
            post(register).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

/// Session routes that require authentication.
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/api/me", get(get_me))
}

// ─── Registration ────────────────────────────────────────────

/// Parsed multipart registration form with staged file paths.
#[derive(Default)]
struct RegisterForm {
    fullname: Option<String>,
    email: Option<String>,
    username: Option<String>,
    password: Option<String>,
    avatar: Option<PathBuf>,
    cover_image: Option<PathBuf>,
}

impl RegisterForm {
    /// Remove any files this form staged to disk.
    async fn discard_staged(&self) {
        if let Some(path) = &self.avatar {
            uploads::discard(path).await;
        }
        if let Some(path) = &self.cover_image {
            uploads::discard(path).await;
        }
    }
}

/// Drain the multipart stream, staging file parts to disk.
///
/// Already-staged files are discarded before any error is returned, so a
/// rejected request leaves nothing behind in the staging directory.
async fn read_register_form(multipart: &mut Multipart, staging_dir: &Path) -> Result<RegisterForm> {
    let mut form = RegisterForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                form.discard_staged().await;
                return Err(AppError::BadRequest(format!(
                    "Malformed multipart body: {}",
                    err
                )));
            }
        };

        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "fullname" | "email" | "username" | "password" => {
                let value = match field.text().await {
                    Ok(value) => value,
                    Err(err) => {
                        form.discard_staged().await;
                        return Err(AppError::BadRequest(format!(
                            "Unreadable field {}: {}",
                            name, err
                        )));
                    }
                };
                match name.as_str() {
                    "fullname" => form.fullname = Some(value),
                    "email" => form.email = Some(value),
                    "username" => form.username = Some(value),
                    _ => form.password = Some(value),
                }
            }
            "avatar" | "coverImage" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = match field.bytes().await {
                    Ok(data) => data,
                    Err(err) => {
                        form.discard_staged().await;
                        return Err(AppError::BadRequest(format!(
                            "Unreadable file {}: {}",
                            name, err
                        )));
                    }
                };
                let staged = match uploads::stage_upload(staging_dir, &file_name, &data).await {
                    Ok(staged) => staged,
                    Err(err) => {
                        form.discard_staged().await;
                        return Err(err);
                    }
                };
                let replaced = if name == "avatar" {
                    form.avatar.replace(staged)
                } else {
                    form.cover_image.replace(staged)
                };
                if let Some(old) = replaced {
                    uploads::discard(&old).await;
                }
            }
            _ => {} // unknown fields are ignored
        }
    }

    Ok(form)
}

/// Register a new user account.
async fn register(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PublicUser>)> {
    let form = read_register_form(&mut multipart, &state.config.upload_dir).await?;

    // Staged files are ephemeral; remove them no matter how the request ends.
    let result = create_account(&state, &form).await;
    form.discard_staged().await;
    result
}

async fn create_account(
    state: &AppState,
    form: &RegisterForm,
) -> Result<(StatusCode, Json<PublicUser>)> {
    let fullname = required_field(&form.fullname)?;
    let email = required_field(&form.email)?;
    let username = required_field(&form.username)?;
    let password = required_field(&form.password)?;

    if state
        .db
        .find_user_by_identity(Some(&username), Some(&email))
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Username or email is already registered".to_string(),
        ));
    }

    let avatar_path = form
        .avatar
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Avatar file is required".to_string()))?;

    let avatar_url = state
        .media
        .upload(avatar_path)
        .await
        .ok_or_else(|| AppError::BadRequest("Avatar upload failed".to_string()))?;

    // Cover image is optional, and a failed upload degrades to an empty URL.
    let cover_url = match form.cover_image.as_deref() {
        Some(path) => state.media.upload(path).await.unwrap_or_default(),
        None => String::new(),
    };

    let created = state
        .db
        .create_user(NewUser {
            username,
            email,
            fullname,
            password,
            avatar: avatar_url,
            cover_image: cover_url,
        })
        .await?;

    // Re-fetch to confirm the record landed; a miss here means the write
    // raced with something destructive.
    let user = state
        .db
        .find_user_by_id(&created.id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("User record missing after create")))?;

    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

/// A required text field, trimmed; blank and missing are the same failure.
fn required_field(value: &Option<String>) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(AppError::BadRequest("All fields are required".to_string())),
    }
}

// ─── Login ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Log in with username or email plus password.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let username = non_blank(&body.username);
    let email = non_blank(&body.email);

    if username.is_none() && email.is_none() {
        return Err(AppError::BadRequest(
            "Username or email is required".to_string(),
        ));
    }
    let password = non_blank(&body.password)
        .ok_or_else(|| AppError::BadRequest("Password is required".to_string()))?;

    let user = state
        .db
        .find_user_by_identity(username, email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !password::verify_password(&user.password_hash, password) {
        return Err(AppError::Unauthorized);
    }

    let pair = state.tokens.issue_pair(&user.id)?;
    state
        .db
        .set_refresh_token(&user.id, &pair.refresh_token)
        .await?;

    let jar = jar
        .add(session_cookie(
            ACCESS_TOKEN_COOKIE,
            pair.access_token.clone(),
            time::Duration::seconds(ACCESS_TOKEN_TTL_SECS as i64),
        ))
        .add(session_cookie(
            REFRESH_TOKEN_COOKIE,
            pair.refresh_token.clone(),
            time::Duration::seconds(REFRESH_TOKEN_TTL_SECS as i64),
        ));

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar,
        Json(LoginResponse {
            user: PublicUser::from(user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ─── Refresh ─────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Exchange a valid refresh token for a fresh pair.
///
/// The supplied token must match the one stored on the user record; a
/// login or logout since issuance invalidates it. On success the stored
/// token is rotated to the new one.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<RefreshResponse>)> {
    let token = if let Some(cookie) = jar.get(REFRESH_TOKEN_COOKIE) {
        cookie.value().to_string()
    } else {
        bearer_token(&headers).ok_or(AppError::Unauthorized)?
    };

    let user_id = state.tokens.verify_refresh(&token)?;

    let user = state
        .db
        .find_user_by_id(&user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let stored = user.refresh_token.as_deref().unwrap_or("");
    if stored.is_empty() || !bool::from(stored.as_bytes().ct_eq(token.as_bytes())) {
        return Err(AppError::Unauthorized);
    }

    let pair = state.tokens.issue_pair(&user.id)?;
    state
        .db
        .set_refresh_token(&user.id, &pair.refresh_token)
        .await?;

    let jar = jar
        .add(session_cookie(
            ACCESS_TOKEN_COOKIE,
            pair.access_token.clone(),
            time::Duration::seconds(ACCESS_TOKEN_TTL_SECS as i64),
        ))
        .add(session_cookie(
            REFRESH_TOKEN_COOKIE,
            pair.refresh_token.clone(),
            time::Duration::seconds(REFRESH_TOKEN_TTL_SECS as i64),
        ));

    Ok((
        jar,
        Json(RefreshResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

// ─── Logout ──────────────────────────────────────────────────

/// Log out the authenticated user.
///
/// Clears the stored refresh token, which immediately invalidates every
/// outstanding refresh token for the account, then removes both cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    state.db.clear_refresh_token(&auth.user.id).await?;

    let jar = jar
        .add(expired_cookie(ACCESS_TOKEN_COOKIE))
        .add(expired_cookie(REFRESH_TOKEN_COOKIE));

    tracing::info!(user_id = %auth.user.id, "User logged out");

    Ok((jar, Json(serde_json::json!({}))))
}

// ─── Profile ─────────────────────────────────────────────────

/// Get the authenticated user's profile.
async fn get_me(Extension(auth): Extension<AuthUser>) -> Json<PublicUser> {
    Json(auth.user)
}

// ─── Cookies ─────────────────────────────────────────────────

fn session_cookie(name: &'static str, value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

/// Removal cookie with attributes matching the ones set at login.
fn expired_cookie(name: &'static str) -> Cookie<'static> {
    session_cookie(name, String::new(), time::Duration::ZERO)
}
