//! Authentication module for the forum hub
//!
//! Registration validation, user creation and login checks, plus the
//! Argon2id credential hasher they rely on.

mod password;
mod service;

pub use password::CredentialHasher;
pub use service::{AuthService, MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH};
