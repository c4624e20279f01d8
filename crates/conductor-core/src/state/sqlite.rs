// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed state store.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::debug;

use super::{ResourceAddress, StateEntry, VersionedStateStore, next_generation};
use crate::error::{CoreError, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/sqlite");

#[derive(Debug, sqlx::FromRow)]
struct StateRow {
    id: String,
    body: String,
    etag: i64,
}

impl StateRow {
    fn into_entry(self) -> Result<StateEntry> {
        Ok(StateEntry {
            id: self.id,
            body: serde_json::from_str(&self.body)?,
            etag: Some(self.etag.to_string()),
        })
    }
}

/// SQLite-backed versioned state store.
#[derive(Clone)]
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Create a store from an existing pool. Migrations are not run.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a database URL and run migrations.
    ///
    /// In-memory URLs (`sqlite::memory:`) are limited to a single connection
    /// because every SQLite memory connection is its own database.
    pub async fn connect(url: &str) -> Result<Self> {
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| CoreError::internal("connect", format!("{}: {}", url, e)))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create and initialize a store from a file path, creating parent
    /// directories and the database file when missing.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                CoreError::internal(
                    "create_dir",
                    format!("Failed to create directory {:?}: {}", parent, e),
                )
            })?;
        }

        Self::connect(&format!("sqlite:{}?mode=rwc", path.to_string_lossy())).await
    }

    /// Run schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    fn is_unique_violation(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    }
}

#[async_trait]
impl VersionedStateStore for SqliteStateStore {
    fn provider_name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, address: &ResourceAddress, id: &str) -> Result<StateEntry> {
        let row = sqlx::query_as::<_, StateRow>(
            r#"
            SELECT id, body, etag
            FROM state_entries
            WHERE grp = ? AND version = ? AND resource = ? AND scope = ? AND id = ?
            "#,
        )
        .bind(&address.group)
        .bind(&address.version)
        .bind(&address.resource)
        .bind(&address.scope)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| CoreError::not_found(address.resource.as_str(), id))?
            .into_entry()
    }

    async fn list(&self, address: &ResourceAddress) -> Result<Vec<StateEntry>> {
        let rows = sqlx::query_as::<_, StateRow>(
            r#"
            SELECT id, body, etag
            FROM state_entries
            WHERE grp = ? AND version = ? AND resource = ? AND scope = ?
            ORDER BY id
            "#,
        )
        .bind(&address.group)
        .bind(&address.version)
        .bind(&address.resource)
        .bind(&address.scope)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StateRow::into_entry).collect()
    }

    async fn upsert(&self, address: &ResourceAddress, entry: StateEntry) -> Result<String> {
        let body = serde_json::to_string(&entry.body)?;
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT etag
            FROM state_entries
            WHERE grp = ? AND version = ? AND resource = ? AND scope = ? AND id = ?
            "#,
        )
        .bind(&address.group)
        .bind(&address.version)
        .bind(&address.resource)
        .bind(&address.scope)
        .bind(&entry.id)
        .fetch_optional(&mut *tx)
        .await?;

        let generation = next_generation(&entry.id, entry.etag.as_deref(), current)?;

        match current {
            None => {
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO state_entries (grp, version, resource, scope, id, body, etag, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&address.group)
                .bind(&address.version)
                .bind(&address.resource)
                .bind(&address.scope)
                .bind(&entry.id)
                .bind(&body)
                .bind(generation)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await;

                if let Err(e) = inserted {
                    if Self::is_unique_violation(&e) {
                        return Err(CoreError::conflict(
                            &entry.id,
                            "entry was created by a concurrent writer",
                        ));
                    }
                    return Err(e.into());
                }
            }
            Some(observed) => {
                let updated = sqlx::query(
                    r#"
                    UPDATE state_entries
                    SET body = ?, etag = ?, updated_at = ?
                    WHERE grp = ? AND version = ? AND resource = ? AND scope = ? AND id = ?
                      AND etag = ?
                    "#,
                )
                .bind(&body)
                .bind(generation)
                .bind(Utc::now())
                .bind(&address.group)
                .bind(&address.version)
                .bind(&address.resource)
                .bind(&address.scope)
                .bind(&entry.id)
                .bind(observed)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() != 1 {
                    return Err(CoreError::conflict(
                        &entry.id,
                        format!("etag '{}' changed during write", observed),
                    ));
                }
            }
        }

        tx.commit().await?;
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
        let result = sqlx::query(
            r#"
            DELETE FROM state_entries
            WHERE grp = ? AND version = ? AND resource = ? AND scope = ? AND id = ?
            "#,
        )
        .bind(&address.group)
        .bind(&address.version)
        .bind(&address.resource)
        .bind(&address.scope)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found(address.resource.as_str(), id));
        }
        Ok(())
    }
}
