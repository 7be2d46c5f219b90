// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod media;
pub mod password;
pub mod token;

pub use media::MediaService;
pub use token::{TokenPair, TokenService};
