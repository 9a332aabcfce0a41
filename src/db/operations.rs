use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::auth::CredentialHasher;
use crate::db::models::{NewUser, StoredCredential};
use crate::error::PersistenceError;

/// What the hub needs from user persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_exists(&self, username: &str) -> Result<bool, PersistenceError>;

    async fn email_exists(&self, email: &str) -> Result<bool, PersistenceError>;

    /// `Ok(false)` for an unknown user, a wrong password, or a stored hash
    /// that cannot be checked.
    async fn correct_password(&self, username: &str, password: &str) -> Result<bool, PersistenceError>;

    async fn register_user(&self, user: &NewUser) -> Result<(), PersistenceError>;
}

#[cfg(test)]
mockall::mock! {
    pub UserStore {}

    #[async_trait]
    impl UserStore for UserStore {
        async fn user_exists(&self, username: &str) -> Result<bool, PersistenceError>;
        async fn email_exists(&self, email: &str) -> Result<bool, PersistenceError>;
        async fn correct_password(&self, username: &str, password: &str) -> Result<bool, PersistenceError>;
        async fn register_user(&self, user: &NewUser) -> Result<(), PersistenceError>;
    }
}

/// PostgreSQL-backed [`UserStore`]. Expects a `users` table with `username`,
/// `age`, `gender`, `firstname`, `lastname`, `password` and `email` text
/// columns.
pub struct DbOperations {
    pool: Arc<PgPool>,
    hasher: CredentialHasher,
}

impl DbOperations {
    pub fn new(pool: Arc<PgPool>, hasher: CredentialHasher) -> Self {
        Self { pool, hasher }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
        hasher: CredentialHasher,
    ) -> Result<Self, PersistenceError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;

        info!("Connected to user database");
        Ok(Self::new(Arc::new(pool), hasher))
    }
}

#[async_trait]
impl UserStore for DbOperations {
    async fn user_exists(&self, username: &str) -> Result<bool, PersistenceError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, PersistenceError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }

    async fn correct_password(&self, username: &str, password: &str) -> Result<bool, PersistenceError> {
        let credential = sqlx::query_as::<_, StoredCredential>(
            "SELECT username, password FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match credential {
            Some(credential) => Ok(self.hasher.verify(password, &credential.password).await),
            None => {
                debug!("No stored credential for {}", username);
                Ok(false)
            }
        }
    }

    async fn register_user(&self, user: &NewUser) -> Result<(), PersistenceError> {
        let mut transaction = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, age, gender, firstname, lastname, password, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&user.username)
        .bind(&user.age)
        .bind(&user.gender)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(&user.email)
        .execute(&mut *transaction)
        .await;

        match result {
            Ok(_) => {
                transaction.commit().await?;
                info!("Created user {}", user.username);
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = transaction.rollback().await {
                    warn!("Rollback after failed insert of {} failed: {}", user.username, rollback);
                }
                Err(e.into())
            }
        }
    }
}
