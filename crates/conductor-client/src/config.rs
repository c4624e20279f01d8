// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the control-plane client.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Url;

use crate::error::{ClientError, Result};

/// Default request timeout when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the [`ControlPlaneClient`](crate::ControlPlaneClient).
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the control-plane API, always ending with `/`.
    pub base_url: String,
    /// User name presented to `users/auth`.
    pub user: String,
    /// Password presented to `users/auth`. May be empty.
    pub password: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration, validating the base URL and user.
    pub fn new(
        base_url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let base_url = normalize_base_url(&base_url.into())?;
        let user = user.into();
        if user.is_empty() {
            return Err(ClientError::Config("user must not be empty".to_string()));
        }
        Ok(Self {
            base_url,
            user,
            password: password.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Build a configuration from a provider property map.
    ///
    /// Keys `baseUrl`, `user` and `password` must all be present.
    /// `baseUrl` and `user` must be non-empty; `password` may be empty.
    /// `requestTimeoutMs` is optional.
    pub fn from_map(properties: &HashMap<String, String>) -> Result<Self> {
        let required = |key: &str| {
            properties
                .get(key)
                .ok_or_else(|| ClientError::Config(format!("'{}' is required", key)))
        };

        let base_url = required("baseUrl")?;
        if base_url.is_empty() {
            return Err(ClientError::Config("'baseUrl' must not be empty".to_string()));
        }
        let user = required("user")?;
        if user.is_empty() {
            return Err(ClientError::Config("'user' must not be empty".to_string()));
        }
        let password = required("password")?;

        let mut config = Self::new(base_url.as_str(), user.as_str(), password.as_str())?;
        if let Some(raw) = properties.get("requestTimeoutMs") {
            let millis: u64 = raw
                .parse()
                .map_err(|e| ClientError::Config(format!("invalid requestTimeoutMs: {}", e)))?;
            config.request_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CONDUCTOR_BASE_URL`: Control-plane API base URL (required)
    /// - `CONDUCTOR_USER`: User name (required)
    /// - `CONDUCTOR_PASSWORD`: Password (required, may be empty)
    /// - `CONDUCTOR_REQUEST_TIMEOUT_MS`: Request timeout in milliseconds (default: 30000)
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| ClientError::Config(format!("{} is required", name)))
        };

        let mut config = Self::new(
            var("CONDUCTOR_BASE_URL")?,
            var("CONDUCTOR_USER")?,
            var("CONDUCTOR_PASSWORD")?,
        )?;

        if let Ok(raw) = std::env::var("CONDUCTOR_REQUEST_TIMEOUT_MS") {
            let millis: u64 = raw.parse().map_err(|e| {
                ClientError::Config(format!("invalid CONDUCTOR_REQUEST_TIMEOUT_MS: {}", e))
            })?;
            config.request_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Absolute URL for an API path relative to the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw)
        .map_err(|e| ClientError::Config(format!("invalid baseUrl '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Config(format!(
            "baseUrl must use http or https, got '{}'",
            url.scheme()
        )));
    }
    let mut normalized = url.to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Ok(normalized)
}
