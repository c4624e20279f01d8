// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for conductor-client.

use conductor_core::CoreError;
use thiserror::Error;

/// Result type using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the control plane.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Credentials rejected, or the token could not be refreshed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The remote reported 404 for the object.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// The remote rejected a write because the object changed.
    #[error("conflicting write to '{name}': {message}")]
    Conflict { name: String, message: String },

    /// The remote rejected the request as malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Server returned a non-2xx response not covered above.
    #[error("server error [{status}]: {message}")]
    Server { status: u16, message: String },

    /// Connection to the control plane failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Unexpected response from server.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Serialization(err.to_string())
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<ClientError> for CoreError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Config(msg) => CoreError::InvalidConfig(msg),
            ClientError::Unauthorized(msg) => CoreError::Unauthorized(msg),
            ClientError::NotFound { kind, name } => CoreError::NotFound { kind, name },
            ClientError::Conflict { name, message } => CoreError::conflict(name, message),
            ClientError::BadRequest(msg) => CoreError::BadRequest(msg),
            ClientError::Server { status, message } => {
                CoreError::internal("remote", format!("[{}] {}", status, message))
            }
            ClientError::Connection(msg) => CoreError::Network(msg),
            ClientError::Timeout => CoreError::Network("request timed out".to_string()),
            ClientError::UnexpectedResponse(msg) => CoreError::internal("decode", msg),
            ClientError::Serialization(msg) => CoreError::internal("json", msg),
            ClientError::Cancelled => CoreError::Cancelled,
        }
    }
}
