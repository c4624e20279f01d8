// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Object access used by the patch engine.
//!
//! The engine only needs three calls. [`ControlPlaneClient`] serves them
//! over HTTP; [`StoreObjectApi`] serves them from a local
//! [`VersionedStateStore`] so the engine can run embedded.

use std::sync::Arc;

use async_trait::async_trait;
use conductor_client::ControlPlaneClient;
use conductor_core::{
    CatalogSpec, CatalogsManager, CoreError, DEFAULT_SCOPE, ObservabilityContext, Result,
    SolutionSpec, SolutionsManager, SpecManager, VersionedStateStore,
};
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait ObjectApi: Send + Sync {
    /// Fetch a solution with its current generation.
    async fn fetch_solution(&self, name: &str, cancel: &CancellationToken) -> Result<SolutionSpec>;

    /// Replace a solution, conditional on `spec.generation` when set.
    async fn replace_solution(
        &self,
        name: &str,
        spec: &SolutionSpec,
        cancel: &CancellationToken,
    ) -> Result<()>;

    async fn fetch_catalog(&self, name: &str, cancel: &CancellationToken) -> Result<CatalogSpec>;
}

#[async_trait]
impl ObjectApi for ControlPlaneClient {
    async fn fetch_solution(&self, name: &str, cancel: &CancellationToken) -> Result<SolutionSpec> {
        Ok(ControlPlaneClient::fetch_solution(self, name, cancel).await?)
    }

    async fn replace_solution(
        &self,
        name: &str,
        spec: &SolutionSpec,
        cancel: &CancellationToken,
    ) -> Result<()> {
        Ok(ControlPlaneClient::replace_solution(self, name, spec, cancel).await?)
    }

    async fn fetch_catalog(&self, name: &str, cancel: &CancellationToken) -> Result<CatalogSpec> {
        Ok(ControlPlaneClient::fetch_catalog(self, name, cancel).await?)
    }
}

/// [`ObjectApi`] over a local state store, confined to one scope.
#[derive(Clone)]
pub struct StoreObjectApi {
    solutions: SolutionsManager,
    catalogs: CatalogsManager,
    scope: String,
}

impl StoreObjectApi {
    pub fn new(store: Arc<dyn VersionedStateStore>, context: ObservabilityContext) -> Self {
        Self {
            solutions: SpecManager::new(store.clone(), context.clone()),
            catalogs: SpecManager::new(store, context),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn solutions(&self) -> &SolutionsManager {
        &self.solutions
    }

    pub fn catalogs(&self) -> &CatalogsManager {
        &self.catalogs
    }
}

#[async_trait]
impl ObjectApi for StoreObjectApi {
    async fn fetch_solution(&self, name: &str, cancel: &CancellationToken) -> Result<SolutionSpec> {
        self.solutions
            .get_spec(name, &self.scope, cancel)
            .await?
            .spec
            .ok_or_else(|| CoreError::not_found("solution", name))
    }

    async fn replace_solution(
        &self,
        name: &str,
        spec: &SolutionSpec,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.solutions
            .upsert_spec(name, spec, &self.scope, cancel)
            .await
            .map(|_| ())
    }

    async fn fetch_catalog(&self, name: &str, cancel: &CancellationToken) -> Result<CatalogSpec> {
        self.catalogs
            .get_spec(name, &self.scope, cancel)
            .await?
            .spec
            .ok_or_else(|| CoreError::not_found("catalog", name))
    }
}
