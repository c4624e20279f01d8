// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conductor Client - remote object access for the control plane
//!
//! This crate fetches and replaces solutions and fetches catalogs over the
//! control plane's REST API, authenticating with a bearer token obtained
//! from `users/auth`.
//!
//! # Example
//!
//! ```ignore
//! use conductor_client::{ClientConfig, ControlPlaneClient};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("http://localhost:8082/v1alpha2/", "admin", "")?;
//!     let client = ControlPlaneClient::new(config)?;
//!     let cancel = CancellationToken::new();
//!
//!     let mut solution = client.fetch_solution("app", &cancel).await?;
//!     solution.display_name = Some("App".to_string());
//!     client.replace_solution("app", &solution, &cancel).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! The client can be configured via environment variables:
//!
//! - `CONDUCTOR_BASE_URL`: Control-plane API base URL
//! - `CONDUCTOR_USER`: User name
//! - `CONDUCTOR_PASSWORD`: Password (may be empty)
//! - `CONDUCTOR_REQUEST_TIMEOUT_MS`: Request timeout in milliseconds (default: 30000)
//!
//! or from a provider property map with [`ClientConfig::from_map`].

mod auth;
mod client;
mod config;
mod error;

pub use client::ControlPlaneClient;
pub use config::{ClientConfig, DEFAULT_REQUEST_TIMEOUT};
pub use error::{ClientError, Result};
