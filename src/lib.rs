// SPDX-License-Identifier: MIT

//! ClipStream Account API
//!
//! This crate provides the account backend for the ClipStream video
//! platform: registration with avatar and cover-image uploads, password
//! login issuing access/refresh token pairs, token refresh, and logout.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod uploads;

use config::Config;
use db::FirestoreDb;
use services::{MediaService, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub media: MediaService,
    pub tokens: TokenService,
}
