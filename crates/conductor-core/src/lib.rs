// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conductor Core - Specs and Versioned State
//!
//! This crate holds the data model shared by every conductor component and
//! the versioned state store that persists it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐   ┌──────────────────────┐
//! │   conductor-patch    │   │  conductor-targets   │   │   conductor-client   │
//! │  (solution patches)  │   │ (provider contract)  │   │  (remote objects)    │
//! └──────────┬───────────┘   └──────────┬───────────┘   └──────────┬───────────┘
//!            │                          │                          │
//!            ▼                          ▼                          ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          conductor-core (this crate)                     │
//! │        model · errors · SpecManager · VersionedStateStore backends       │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                         │                          │
//!                         ▼                          ▼
//!                  MemoryStateStore           SqliteStateStore
//! ```
//!
//! # Optimistic Concurrency
//!
//! Every stored entry carries an ETag derived from a generation counter.
//! Writers pass the ETag they last observed; a write whose ETag is stale
//! fails with [`CoreError::Conflict`] and the caller re-fetches. There are
//! no locks on stored objects and no cross-object transactions.
//!
//! # Cancellation
//!
//! Blocking operations take a [`tokio_util::sync::CancellationToken`] and
//! return [`CoreError::Cancelled`] when it fires (see [`cancel::cancellable`]).

pub mod cancel;
pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod observability;
pub mod state;

pub use config::{StateProviderKind, StateStoreConfig};
pub use error::{CoreError, ErrorKind, Result};
pub use manager::{
    CatalogsManager, InstancesManager, ManagedSpec, SolutionsManager, SpecManager,
};
pub use model::{
    CatalogSpec, ComponentAction, ComponentSpec, ComponentStep, DEFAULT_SCOPE, DeploymentSpec,
    DeploymentStep, InstanceSpec, ObjectState, SolutionSpec, TargetSelector,
};
pub use observability::ObservabilityContext;
pub use state::{
    MemoryStateStore, ResourceAddress, SqliteStateStore, StateEntry, VersionedStateStore,
    open_state_store,
};
