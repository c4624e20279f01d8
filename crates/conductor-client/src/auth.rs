// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bearer token cache shared by concurrent requests.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::Result;

/// Body posted to `users/auth`.
#[derive(Debug, Serialize)]
pub(crate) struct AuthRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response returned by `users/auth`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// A cached token. `epoch` increases with every successful login, so a
/// caller holding a rejected token can tell whether someone already
/// replaced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BearerToken {
    pub value: String,
    pub epoch: u64,
}

#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    current: RwLock<Option<BearerToken>>,
    refresh: Mutex<()>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token, logging in if there is none yet.
    pub async fn get_or_login<F, Fut>(&self, login: F) -> Result<BearerToken>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(token) = self.current.read().await.clone() {
            return Ok(token);
        }
        self.refresh(None, login).await
    }

    /// Replace the token whose epoch is `stale_epoch`.
    ///
    /// Refreshes are serialized. If another caller already replaced the
    /// stale token, its result is returned without logging in again.
    pub async fn refresh<F, Fut>(&self, stale_epoch: Option<u64>, login: F) -> Result<BearerToken>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let _guard = self.refresh.lock().await;

        if let Some(token) = self.current.read().await.clone()
            && Some(token.epoch) != stale_epoch
        {
            return Ok(token);
        }

        let value = login().await?;
        let mut current = self.current.write().await;
        let epoch = current.as_ref().map_or(1, |t| t.epoch + 1);
        let token = BearerToken { value, epoch };
        *current = Some(token.clone());
        debug!(epoch, "Bearer token refreshed");
        Ok(token)
    }
}
