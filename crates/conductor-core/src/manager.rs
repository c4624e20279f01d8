// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Thin CRUD managers over the versioned state store.
//!
//! A manager wraps a typed spec into a resource document
//! (`apiVersion`, `kind`, `metadata.name`, `spec`, `scope`) and maps the
//! entry ETag back into the spec's `generation`.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug};

use crate::cancel::cancellable;
use crate::error::{CoreError, Result};
use crate::model::{
    CatalogSpec, DEFAULT_SCOPE, FEDERATION_GROUP, InstanceSpec, ObjectState, SOLUTION_GROUP,
    SolutionSpec, normalize_scope,
};
use crate::observability::ObservabilityContext;
use crate::state::{ResourceAddress, StateEntry, VersionedStateStore};

/// A spec type that can be stored through a [`SpecManager`].
pub trait ManagedSpec: Serialize + DeserializeOwned + Send + Sync {
    const GROUP: &'static str;
    const RESOURCE: &'static str;
    const KIND: &'static str;

    fn generation(&self) -> Option<&str>;
    fn set_generation(&mut self, generation: Option<String>);
}

macro_rules! managed_spec {
    ($ty:ty, $group:expr, $resource:literal, $kind:literal) => {
        impl ManagedSpec for $ty {
            const GROUP: &'static str = $group;
            const RESOURCE: &'static str = $resource;
            const KIND: &'static str = $kind;

            fn generation(&self) -> Option<&str> {
                self.generation.as_deref()
            }

            fn set_generation(&mut self, generation: Option<String>) {
                self.generation = generation;
            }
        }
    };
}

managed_spec!(SolutionSpec, SOLUTION_GROUP, "solutions", "Solution");
managed_spec!(InstanceSpec, SOLUTION_GROUP, "instances", "Instance");
managed_spec!(CatalogSpec, FEDERATION_GROUP, "catalogs", "Catalog");

pub type SolutionsManager = SpecManager<SolutionSpec>;
pub type InstancesManager = SpecManager<InstanceSpec>;
pub type CatalogsManager = SpecManager<CatalogSpec>;

/// CRUD adapter for one resource kind.
pub struct SpecManager<T> {
    store: Arc<dyn VersionedStateStore>,
    context: ObservabilityContext,
    _spec: PhantomData<fn() -> T>,
}

impl<T> Clone for SpecManager<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            context: self.context.clone(),
            _spec: PhantomData,
        }
    }
}

impl<T: ManagedSpec> SpecManager<T> {
    pub fn new(store: Arc<dyn VersionedStateStore>, context: ObservabilityContext) -> Self {
        Self {
            store,
            context,
            _spec: PhantomData,
        }
    }

    fn address(scope: &str) -> ResourceAddress {
        ResourceAddress::new(T::GROUP, "v1", T::RESOURCE, scope)
    }

    /// Create or replace `name`. The spec's generation is the write
    /// precondition; returns the new generation.
    pub async fn upsert_spec(
        &self,
        name: &str,
        spec: &T,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let scope = normalize_scope(scope);
        let mut body_spec = serde_json::to_value(spec)?;
        if let Value::Object(map) = &mut body_spec {
            map.remove("generation");
        }
        let body = json!({
            "apiVersion": format!("{}/v1", T::GROUP),
            "kind": T::KIND,
            "metadata": { "name": name },
            "spec": body_spec,
            "scope": scope,
        });
        let mut entry = StateEntry::new(name, body);
        entry.etag = spec.generation().map(str::to_string);

        let address = Self::address(scope);
        let store = self.store.clone();
        cancellable(
            cancel,
            async move {
                let etag = store.upsert(&address, entry).await?;
                debug!(kind = T::KIND, name, scope = %address.scope, etag = %etag, "Spec upserted");
                Ok(etag)
            }
            .instrument(self.context.operation("UpsertSpec")),
        )
        .await
    }

    pub async fn get_spec(
        &self,
        name: &str,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<ObjectState<T>> {
        let address = Self::address(scope);
        let entry = cancellable(
            cancel,
            self.store
                .get(&address, name)
                .instrument(self.context.operation("GetSpec")),
        )
        .await
        .map_err(|e| match e {
            CoreError::NotFound { .. } => CoreError::not_found(T::KIND.to_lowercase(), name),
            other => other,
        })?;
        decode_state(entry)
    }

    pub async fn list_spec(
        &self,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ObjectState<T>>> {
        let address = Self::address(scope);
        let entries = cancellable(
            cancel,
            self.store
                .list(&address)
                .instrument(self.context.operation("ListSpec")),
        )
        .await?;
        entries.into_iter().map(decode_state).collect()
    }

    pub async fn delete_spec(
        &self,
        name: &str,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let address = Self::address(scope);
        cancellable(
            cancel,
            self.store
                .delete(&address, name)
                .instrument(self.context.operation("DeleteSpec")),
        )
        .await
        .map_err(|e| match e {
            CoreError::NotFound { .. } => CoreError::not_found(T::KIND.to_lowercase(), name),
            other => other,
        })
    }
}

fn decode_state<T: ManagedSpec>(entry: StateEntry) -> Result<ObjectState<T>> {
    let StateEntry { id, body, etag } = entry;

    let spec_value = body
        .get("spec")
        .cloned()
        .ok_or_else(|| CoreError::internal("decode", format!("entry '{}' has no spec", id)))?;
    let mut spec: T = serde_json::from_value(spec_value)?;
    spec.set_generation(etag);

    let scope = body
        .get("scope")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SCOPE)
        .to_string();

    let status = match body.get("status") {
        Some(Value::Null) | None => BTreeMap::new(),
        Some(value) => serde_json::from_value(value.clone())?,
    };

    Ok(ObjectState {
        id,
        scope,
        spec: Some(spec),
        status,
    })
}
