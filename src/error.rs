//! Error types for the admin layer.
//!
//! Only [`InvalidTokenError`] ever terminates a request. Credential and input
//! problems are reported to the user through session flash messages instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// A submitted CSRF token did not match the session's current token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid CSRF token for namespace {namespace:?}")]
pub struct InvalidTokenError {
    pub namespace: String,
}

impl IntoResponse for InvalidTokenError {
    fn into_response(self) -> Response {
        tracing::warn!("{}", self);

        (StatusCode::FORBIDDEN, "Error: Invalid token").into_response()
    }
}

/// Failure while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Failure while reading or writing the credential store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Failed to parse users file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize users file: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Credential store lock poisoned")]
    Poisoned,
}

/// Failure while hashing a password.
#[derive(Error, Debug)]
#[error("Failed to hash password: {0}")]
pub struct HashError(pub String);
