// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! State store configuration loaded from environment variables.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Available state store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateProviderKind {
    #[default]
    Memory,
    Sqlite,
}

impl FromStr for StateProviderKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "memory-state" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(CoreError::InvalidConfig(format!(
                "unknown state provider '{}', expected 'memory' or 'sqlite'",
                other
            ))),
        }
    }
}

impl fmt::Display for StateProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Selects and parameterizes the state store backend.
#[derive(Debug, Clone, Default)]
pub struct StateStoreConfig {
    pub provider: StateProviderKind,
    /// Connection URL, required for `sqlite`.
    pub database_url: Option<String>,
}

impl StateStoreConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn sqlite(database_url: impl Into<String>) -> Self {
        Self {
            provider: StateProviderKind::Sqlite,
            database_url: Some(database_url.into()),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Optional (with defaults):
    /// - `CONDUCTOR_STATE_PROVIDER`: `memory` or `sqlite` (default: memory)
    ///
    /// Required for sqlite:
    /// - `CONDUCTOR_DATABASE_URL`: SQLite connection string
    pub fn from_env() -> Result<Self, CoreError> {
        let provider: StateProviderKind = std::env::var("CONDUCTOR_STATE_PROVIDER")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()?;

        let database_url = std::env::var("CONDUCTOR_DATABASE_URL")
            .ok()
            .filter(|url| !url.is_empty());

        if provider == StateProviderKind::Sqlite && database_url.is_none() {
            return Err(CoreError::InvalidConfig(
                "missing required environment variable: CONDUCTOR_DATABASE_URL".to_string(),
            ));
        }

        Ok(Self {
            provider,
            database_url,
        })
    }
}
