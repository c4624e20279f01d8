// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory state store.
//!
//! HashMap-backed store for tests and single-process deployments. Clone
//! shares the same storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ResourceAddress, StateEntry, VersionedStateStore, next_generation};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
struct StoredEntry {
    body: Value,
    generation: i64,
}

type EntryKey = (ResourceAddress, String);

/// In-memory versioned state store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    entries: Arc<RwLock<HashMap<EntryKey, StoredEntry>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn to_entry(id: &str, stored: &StoredEntry) -> StateEntry {
        StateEntry {
            id: id.to_string(),
            body: stored.body.clone(),
            etag: Some(stored.generation.to_string()),
        }
    }
}

#[async_trait]
impl VersionedStateStore for MemoryStateStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, address: &ResourceAddress, id: &str) -> Result<StateEntry> {
        let entries = self.entries.read().await;
        entries
            .get(&(address.clone(), id.to_string()))
            .map(|stored| Self::to_entry(id, stored))
            .ok_or_else(|| CoreError::not_found(address.resource.as_str(), id))
    }

    async fn list(&self, address: &ResourceAddress) -> Result<Vec<StateEntry>> {
        let entries = self.entries.read().await;
        let mut listed: Vec<StateEntry> = entries
            .iter()
            .filter(|((addr, _), _)| addr == address)
            .map(|((_, id), stored)| Self::to_entry(id, stored))
            .collect();
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listed)
    }

    async fn upsert(&self, address: &ResourceAddress, entry: StateEntry) -> Result<String> {
        let key = (address.clone(), entry.id.clone());
        let mut entries = self.entries.write().await;

        let current = entries.get(&key).map(|stored| stored.generation);
        let generation = next_generation(&entry.id, entry.etag.as_deref(), current)?;

        entries.insert(
            key,
            StoredEntry {
                body: entry.body,
                generation,
            },
        );
        debug!(
            resource = %address.resource,
            scope = %address.scope,
            id = %entry.id,
            generation,
            "State entry upserted"
        );
        Ok(generation.to_string())
    }

    async fn delete(&self, address: &ResourceAddress, id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries
            .remove(&(address.clone(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found(address.resource.as_str(), id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn solutions(scope: &str) -> ResourceAddress {
        ResourceAddress::new("solution.conductor.io", "v1", "solutions", scope)
    }

    #[tokio::test]
    async fn test_upsert_creates_and_advances_etag() {
        let store = MemoryStateStore::new();
        let address = solutions("default");

        let etag = store
            .upsert(&address, StateEntry::new("s1", json!({"a": 1})))
            .await
            .unwrap();
        assert_eq!(etag, "1");

        let etag = store
            .upsert(&address, StateEntry::new("s1", json!({"a": 2})).with_etag("1"))
            .await
            .unwrap();
        assert_eq!(etag, "2");

        let entry = store.get(&address, "s1").await.unwrap();
        assert_eq!(entry.body, json!({"a": 2}));
        assert_eq!(entry.etag.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_stale_etag_is_rejected_without_writing() {
        let store = MemoryStateStore::new();
        let address = solutions("default");
        store
            .upsert(&address, StateEntry::new("s1", json!({"v": "first"})))
            .await
            .unwrap();
        store
            .upsert(&address, StateEntry::new("s1", json!({"v": "second"})).with_etag("1"))
            .await
            .unwrap();

        let result = store
            .upsert(&address, StateEntry::new("s1", json!({"v": "stale"})).with_etag("1"))
            .await;
        assert!(matches!(result, Err(CoreError::Conflict { .. })));

        let entry = store.get(&address, "s1").await.unwrap();
        assert_eq!(entry.body, json!({"v": "second"}));
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let store = MemoryStateStore::new();
        store
            .upsert(&solutions("tenant-a"), StateEntry::new("s1", json!({})))
            .await
            .unwrap();
        store
            .upsert(&solutions("tenant-b"), StateEntry::new("s2", json!({})))
            .await
            .unwrap();

        let listed = store.list(&solutions("tenant-a")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "s1");

        let result = store.get(&solutions("tenant-b"), "s1").await;
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = MemoryStateStore::new();
        let address = solutions("default");
        store
            .upsert(&address, StateEntry::new("s1", json!({})))
            .await
            .unwrap();

        store.delete(&address, "s1").await.unwrap();
        let result = store.delete(&address, "s1").await;
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let store = MemoryStateStore::new();
        let address = solutions("default");
        for id in ["c", "a", "b"] {
            store
                .upsert(&address, StateEntry::new(id, json!({})))
                .await
                .unwrap();
        }
        let ids: Vec<String> = store
            .list(&address)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
