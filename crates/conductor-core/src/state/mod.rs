// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Versioned state store interfaces and backends.
//!
//! A state store keeps opaque JSON bodies under the compound key
//! `(group, version, resource, scope, id)`. Writes are guarded by an ETag:
//! an upsert that carries an ETag only succeeds while the stored entry still
//! has that ETag, and every successful write advances it.

pub mod memory;
pub mod sqlite;

pub use self::memory::MemoryStateStore;
pub use self::sqlite::SqliteStateStore;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{StateProviderKind, StateStoreConfig};
use crate::error::{CoreError, Result};
use crate::model::normalize_scope;

/// Addressing metadata carried by every store call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceAddress {
    pub group: String,
    pub version: String,
    pub resource: String,
    pub scope: String,
}

impl ResourceAddress {
    /// Build an address. An empty scope resolves to the default scope.
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
        scope: &str,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
            scope: normalize_scope(scope).to_string(),
        }
    }

    /// Same resource kind, different scope.
    pub fn in_scope(&self, scope: &str) -> Self {
        Self {
            scope: normalize_scope(scope).to_string(),
            ..self.clone()
        }
    }
}

/// A stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEntry {
    pub id: String,
    pub body: Value,
    /// Precondition on write, current version on read.
    pub etag: Option<String>,
}

impl StateEntry {
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            body,
            etag: None,
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

/// Trait for versioned state stores.
///
/// Implementations carry no business semantics: callers interpret `body`.
/// A `get` or `list` must never return entries from another scope.
#[async_trait]
pub trait VersionedStateStore: Send + Sync {
    /// Provider name used for selection at startup (e.g. "memory", "sqlite").
    fn provider_name(&self) -> &'static str;

    /// Fetch one entry. Fails with `NotFound` when absent.
    async fn get(&self, address: &ResourceAddress, id: &str) -> Result<StateEntry>;

    /// All entries under an address, ordered by id.
    async fn list(&self, address: &ResourceAddress) -> Result<Vec<StateEntry>>;

    /// Create or replace an entry and return its new ETag.
    ///
    /// When `entry.etag` is set and the stored entry has a different ETag,
    /// or no longer exists, the write fails with `Conflict` and nothing is
    /// stored.
    async fn upsert(&self, address: &ResourceAddress, entry: StateEntry) -> Result<String>;

    /// Remove an entry. Fails with `NotFound` when absent.
    async fn delete(&self, address: &ResourceAddress, id: &str) -> Result<()>;
}

/// Compute the generation that follows `current`, honoring the precondition.
pub(crate) fn next_generation(id: &str, expected: Option<&str>, current: Option<i64>) -> Result<i64> {
    match (expected, current) {
        (Some(expected), Some(current)) if expected != current.to_string() => {
            Err(CoreError::conflict(
                id,
                format!("expected etag '{}', found '{}'", expected, current),
            ))
        }
        (Some(expected), None) => Err(CoreError::conflict(
            id,
            format!("expected etag '{}', but the entry no longer exists", expected),
        )),
        (_, Some(current)) => Ok(current + 1),
        (None, None) => Ok(1),
    }
}

/// Open the backend named by the configuration.
pub async fn open_state_store(config: &StateStoreConfig) -> Result<Arc<dyn VersionedStateStore>> {
    match config.provider {
        StateProviderKind::Memory => Ok(Arc::new(MemoryStateStore::new())),
        StateProviderKind::Sqlite => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                CoreError::InvalidConfig("sqlite state store requires a database url".to_string())
            })?;
            Ok(Arc::new(SqliteStateStore::connect(url).await?))
        }
    }
}
