use thiserror::Error;

use crate::websocket::MessageKind;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Decode error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("Transport error: {0}")]
    TransportError(#[from] TransportError),

    #[error("Persistence error: {0}")]
    PersistenceError(#[from] PersistenceError),

    #[error("Hashing error: {0}")]
    HashingError(#[from] HashingError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

// Implement conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

// Implement conversion from sqlx::Error
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::PersistenceError(err.into())
    }
}

// Add conversion from std::io::Error
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

/// Failures turning an inbound frame into an [`crate::websocket::Envelope`].
/// None of these close the connection.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Unrecognized type value {0:?}")]
    UnrecognizedKind(String),

    #[error("Invalid {kind} payload: {reason}")]
    PayloadDecodeError { kind: MessageKind, reason: String },
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Message sending failed: {0}")]
    Send(String),

    #[error("Connection closed by peer")]
    Closed,
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record")]
    Duplicate,
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => PersistenceError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                PersistenceError::Connection(err.to_string())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                PersistenceError::Duplicate
            }
            _ => PersistenceError::Query(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum HashingError {
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),
}
