use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::CredentialHasher;
use crate::db::{NewUser, UserStore};
use crate::error::AppError;
use crate::websocket::{FormValidation, LoginPayload, LoginValidation, RegistrationPayload};

pub const MIN_USERNAME_LENGTH: usize = 5;
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// Registration and login checks against the user store.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: CredentialHasher) -> Self {
        Self { store, hasher }
    }

    /// Runs every registration rule and reports all failures together.
    pub async fn validate_registration(
        &self,
        registration: &RegistrationPayload,
    ) -> Result<FormValidation, AppError> {
        let mut validation = FormValidation::new();

        if registration.username.len() < MIN_USERNAME_LENGTH {
            validation.username_length = true;
        }
        if registration.username.chars().any(char::is_whitespace) {
            validation.username_space = true;
        }
        if self.store.user_exists(&registration.username).await? {
            validation.username_duplicate = true;
        }
        if self.store.email_exists(&registration.email).await? {
            validation.email_duplicate = true;
        }
        if registration.password.len() < MIN_PASSWORD_LENGTH {
            validation.password_length = true;
        }

        if !validation.passed() {
            info!("Registration of {} rejected: {:?}", registration.username, validation);
        }
        Ok(validation)
    }

    /// Hashes the password and creates the user. Call only after
    /// [`Self::validate_registration`] passed.
    pub async fn create_user(&self, registration: &RegistrationPayload) -> Result<(), AppError> {
        let password_hash = self.hasher.hash(&registration.password).await?;
        let user = NewUser::from_registration(registration, password_hash);
        self.store.register_user(&user).await?;

        info!("Registered user {}", registration.username);
        Ok(())
    }

    /// Checks existence first; the password is only verified for a known user.
    pub async fn login(&self, login: &LoginPayload) -> Result<LoginValidation, AppError> {
        if !self.store.user_exists(&login.username).await? {
            warn!("Login attempt for unknown user {}", login.username);
            return Ok(LoginValidation::invalid_username());
        }

        if !self.store.correct_password(&login.username, &login.password).await? {
            warn!("Wrong password for user {}", login.username);
            return Ok(LoginValidation::invalid_password());
        }

        info!("User {} logged in", login.username);
        Ok(LoginValidation::success())
    }
}
