// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Target provider trait definitions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use conductor_core::{DeploymentSpec, DeploymentStep, Result};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::validation::ValidationRule;

/// Outcome for one component of an applied step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentStatus {
    Updated,
    Deleted,
    /// Validated but not applied (dry run).
    Untouched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentResult {
    pub status: ComponentStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ComponentResult {
    pub fn new(status: ComponentStatus) -> Self {
        Self {
            status,
            message: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Trait for deployment target providers.
///
/// A provider applies the components of one deployment step to the
/// infrastructure it manages. Before any side effect, `apply` must check
/// the step against [`validation_rule`](Self::validation_rule) (see
/// [`validate_step`](crate::validate_step)) and fail with
/// `CoreError::BadRequest` naming the offending component. The check runs
/// identically with `is_dry_run` set; dry run only skips the side effects.
///
/// [`conformance`](crate::conformance) verifies this for any implementation.
#[async_trait]
pub trait TargetProvider: Send + Sync {
    /// Provider type identifier (e.g., "mock", "helm", "ebpf")
    fn provider_type(&self) -> &'static str;

    /// Requirements every applied component must meet.
    fn validation_rule(&self) -> ValidationRule;

    /// Apply the step's components, returning a result per component name.
    async fn apply(
        &self,
        deployment: &DeploymentSpec,
        step: &DeploymentStep,
        is_dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, ComponentResult>>;
}
