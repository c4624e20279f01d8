// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for conductor-core.
//!
//! Every layer of conductor reports failures in one taxonomy so that a
//! caller sees the same kind no matter which component produced it.

use std::fmt;

use thiserror::Error;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    Unauthorized,
    Network,
    Internal,
    InvalidConfig,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "NotFound",
            Self::BadRequest => "BadRequest",
            Self::Conflict => "Conflict",
            Self::Unauthorized => "Unauthorized",
            Self::Network => "NetworkError",
            Self::Internal => "InternalError",
            Self::InvalidConfig => "InvalidConfig",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while storing, patching or applying specs.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Object, catalog or component referenced by name does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// What was looked up (e.g. "solution", "catalog", "component").
        kind: String,
        /// The name or id that was not found.
        name: String,
    },

    /// Malformed request or a failed target validation.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Optimistic-concurrency precondition mismatch.
    #[error("conflicting write to '{id}': {details}")]
    Conflict {
        /// Id of the object whose write was rejected.
        id: String,
        /// Error details.
        details: String,
    },

    /// Authentication failed or the token could not be refreshed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Transport failure talking to a remote endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected failure inside a backend.
    #[error("internal error during '{operation}': {details}")]
    Internal {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// Missing or invalid configuration detected at initialization.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The caller cancelled the operation before it completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl CoreError {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn conflict(id: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Conflict {
            id: id.into(),
            details: details.into(),
        }
    }

    pub fn internal(operation: impl Into<String>, details: impl fmt::Display) -> Self {
        Self::Internal {
            operation: operation.into(),
            details: details.to_string(),
        }
    }

    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Network(_) => ErrorKind::Network,
            Self::Internal { .. } => ErrorKind::Internal,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Conflict { .. } => "CONFLICT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::internal("query", err)
    }
}

impl From<sqlx::migrate::MigrateError> for CoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CoreError::internal("migrate", err)
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::internal("json", err)
    }
}
