// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conductor Patch - incremental edits to solution component trees
//!
//! A patch request names a solution, a payload (inline JSON or a catalog
//! reference) and either a whole component or an array-valued property
//! inside one component. The engine fetches the solution, merges the
//! payload, and writes the result back conditional on the fetched
//! generation.
//!
//! ```ignore
//! use std::sync::Arc;
//! use conductor_client::{ClientConfig, ControlPlaneClient};
//! use conductor_patch::PatchEngine;
//! use serde_json::json;
//! use tokio_util::sync::CancellationToken;
//!
//! let client = ControlPlaneClient::new(ClientConfig::from_env()?)?;
//! let engine = PatchEngine::new(Arc::new(client));
//! let inputs = json!({
//!     "objectType": "solution",
//!     "objectName": "solution1",
//!     "patchSource": "catalog",
//!     "patchContent": "catalog1",
//!     "component": "ebpf-module",
//!     "property": "input",
//!     "subKey": "adapter",
//!     "patchAction": "add"
//! });
//! let outputs = engine
//!     .process(inputs.as_object().unwrap(), &CancellationToken::new())
//!     .await?;
//! assert_eq!(outputs["status"], "OK");
//! ```

pub mod engine;
pub mod merge;
pub mod object_api;
pub mod request;

pub use engine::{PatchEngine, PatchOutcome};
pub use merge::{Change, RemovalMatch};
pub use object_api::{ObjectApi, StoreObjectApi};
pub use request::{ObjectKind, PatchAction, PatchRequest, PatchSource, PropertyPath};
