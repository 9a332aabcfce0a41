use sqlx::FromRow;

use crate::websocket::RegistrationPayload;

/// A user about to be created. Only ever built with an already hashed
/// password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub age: String,
    pub gender: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub email: String,
}

impl NewUser {
    pub fn from_registration(registration: &RegistrationPayload, password_hash: String) -> Self {
        Self {
            username: registration.username.clone(),
            age: registration.age.clone(),
            gender: registration.gender.clone(),
            first_name: registration.first_name.clone(),
            last_name: registration.last_name.clone(),
            password_hash,
            email: registration.email.clone(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StoredCredential {
    pub username: String,
    pub password: String,
}
