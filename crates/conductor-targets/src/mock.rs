// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock target provider for testing.
//!
//! Validates like a real provider, then records the components it would
//! have applied instead of touching any infrastructure.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use conductor_core::{ComponentAction, ComponentStep, CoreError, DeploymentSpec, DeploymentStep, Result};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::provider::{ComponentResult, ComponentStatus, TargetProvider};
use crate::validation::{ValidationRule, validate_step};

/// Mock target provider for testing.
#[derive(Clone)]
pub struct MockTargetProvider {
    rule: ValidationRule,
    applied: Arc<Mutex<Vec<ComponentStep>>>,
    /// If true, apply fails after validation as if the target were down.
    pub fail_by_default: bool,
}

impl Default for MockTargetProvider {
    fn default() -> Self {
        Self::new(ValidationRule::default())
    }
}

impl MockTargetProvider {
    /// Create a mock provider enforcing `rule`.
    pub fn new(rule: ValidationRule) -> Self {
        Self {
            rule,
            applied: Arc::new(Mutex::new(Vec::new())),
            fail_by_default: false,
        }
    }

    /// Create a mock provider whose non-dry-run applies fail.
    pub fn failing(rule: ValidationRule) -> Self {
        Self {
            fail_by_default: true,
            ..Self::new(rule)
        }
    }

    /// Component steps applied so far, in order.
    pub async fn applied(&self) -> Vec<ComponentStep> {
        self.applied.lock().await.clone()
    }
}

#[async_trait]
impl TargetProvider for MockTargetProvider {
    fn provider_type(&self) -> &'static str {
        "mock"
    }

    fn validation_rule(&self) -> ValidationRule {
        self.rule.clone()
    }

    async fn apply(
        &self,
        deployment: &DeploymentSpec,
        step: &DeploymentStep,
        is_dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, ComponentResult>> {
        validate_step(&self.rule, deployment, step)?;

        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        if is_dry_run {
            debug!(
                solution = %deployment.solution_name,
                components = step.components.len(),
                "Dry run, nothing applied"
            );
            return Ok(step
                .components
                .iter()
                .map(|c| {
                    (
                        c.component.name.clone(),
                        ComponentResult::new(ComponentStatus::Untouched).with_message("dry run"),
                    )
                })
                .collect());
        }

        if self.fail_by_default {
            return Err(CoreError::internal("apply", "mock target failure"));
        }

        let mut applied = self.applied.lock().await;
        let mut results = BTreeMap::new();
        for component_step in &step.components {
            let status = match component_step.action {
                ComponentAction::Update => ComponentStatus::Updated,
                ComponentAction::Delete => ComponentStatus::Deleted,
            };
            applied.push(component_step.clone());
            results.insert(
                component_step.component.name.clone(),
                ComponentResult::new(status),
            );
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::{ComponentSpec, SolutionSpec};
    use serde_json::json;

    fn deployment_with(component: ComponentSpec) -> DeploymentSpec {
        DeploymentSpec {
            solution_name: "app".to_string(),
            solution: SolutionSpec {
                components: vec![component],
                ..SolutionSpec::default()
            },
            component_start_index: 0,
            component_end_index: 1,
            ..DeploymentSpec::default()
        }
    }

    fn step(name: &str, action: ComponentAction) -> DeploymentStep {
        DeploymentStep {
            components: vec![ComponentStep {
                action,
                component: ComponentSpec::new(name, "service"),
            }],
            ..DeploymentStep::default()
        }
    }

    #[tokio::test]
    async fn test_apply_records_components() {
        let provider = MockTargetProvider::default();
        let deployment = deployment_with(ComponentSpec::new("web", "service"));
        let cancel = CancellationToken::new();

        let results = provider
            .apply(&deployment, &step("web", ComponentAction::Update), false, &cancel)
            .await
            .unwrap();
        assert_eq!(results["web"].status, ComponentStatus::Updated);

        let results = provider
            .apply(&deployment, &step("web", ComponentAction::Delete), false, &cancel)
            .await
            .unwrap();
        assert_eq!(results["web"].status, ComponentStatus::Deleted);
        assert_eq!(provider.applied().await.len(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_validates_but_records_nothing() {
        let rule = ValidationRule::new().with_required_properties(["image"]);
        let provider = MockTargetProvider::new(rule);
        let cancel = CancellationToken::new();

        let incomplete = deployment_with(ComponentSpec::new("web", "service"));
        let err = provider
            .apply(&incomplete, &step("web", ComponentAction::Update), true, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));

        let complete = deployment_with(
            ComponentSpec::new("web", "service").with_property("image", json!("nginx")),
        );
        let results = provider
            .apply(&complete, &step("web", ComponentAction::Update), true, &cancel)
            .await
            .unwrap();
        assert_eq!(results["web"].status, ComponentStatus::Untouched);
        assert!(provider.applied().await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_provider_still_validates_first() {
        let provider = MockTargetProvider::failing(ValidationRule::new().with_required_metadata(["owner"]));
        let deployment = deployment_with(ComponentSpec::new("web", "service"));
        let err = provider
            .apply(
                &deployment,
                &step("web", ComponentAction::Update),
                false,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));

        let deployment = deployment_with(ComponentSpec::new("web", "service").with_metadata("owner", "ops"));
        let err = provider
            .apply(
                &deployment,
                &step("web", ComponentAction::Update),
                false,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_apply_records_nothing() {
        let provider = MockTargetProvider::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = provider
            .apply(
                &deployment_with(ComponentSpec::new("web", "service")),
                &step("web", ComponentAction::Update),
                false,
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
        assert!(provider.applied().await.is_empty());
    }
}
