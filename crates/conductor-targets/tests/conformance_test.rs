// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conformance suite against conforming and non-conforming providers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use conductor_core::{CoreError, DeploymentSpec, DeploymentStep, ErrorKind, Result};
use conductor_targets::conformance::{
    any_required_metadata_missing, any_required_property_missing,
    required_properties_and_metadata,
};
use conductor_targets::{
    ComponentResult, ComponentStatus, ConformanceError, MockTargetProvider, TargetProvider,
    ValidationRule, run_conformance_suite, validate_step,
};
use tokio_util::sync::CancellationToken;

fn rule() -> ValidationRule {
    ValidationRule::new()
        .with_required_properties(["p1", "p2"])
        .with_required_metadata(["m1"])
}

/// Applies without validating.
struct CarelessProvider {
    rule: ValidationRule,
}

#[async_trait]
impl TargetProvider for CarelessProvider {
    fn provider_type(&self) -> &'static str {
        "careless"
    }

    fn validation_rule(&self) -> ValidationRule {
        self.rule.clone()
    }

    async fn apply(
        &self,
        _: &DeploymentSpec,
        step: &DeploymentStep,
        _: bool,
        _: &CancellationToken,
    ) -> Result<BTreeMap<String, ComponentResult>> {
        Ok(step
            .components
            .iter()
            .map(|c| {
                (
                    c.component.name.clone(),
                    ComponentResult::new(ComponentStatus::Updated),
                )
            })
            .collect())
    }
}

/// Validates properties only, and reports the failure with the wrong kind.
struct SloppyProvider {
    rule: ValidationRule,
}

#[async_trait]
impl TargetProvider for SloppyProvider {
    fn provider_type(&self) -> &'static str {
        "sloppy"
    }

    fn validation_rule(&self) -> ValidationRule {
        self.rule.clone()
    }

    async fn apply(
        &self,
        deployment: &DeploymentSpec,
        step: &DeploymentStep,
        _: bool,
        _: &CancellationToken,
    ) -> Result<BTreeMap<String, ComponentResult>> {
        let properties_only = ValidationRule::new()
            .with_required_properties(self.rule.required_properties().iter().cloned());
        validate_step(&properties_only, deployment, step)
            .map_err(|e| CoreError::internal("validate", e))?;
        Ok(BTreeMap::new())
    }
}

/// Rejects incomplete components without saying which one.
struct TerseProvider {
    rule: ValidationRule,
}

#[async_trait]
impl TargetProvider for TerseProvider {
    fn provider_type(&self) -> &'static str {
        "terse"
    }

    fn validation_rule(&self) -> ValidationRule {
        self.rule.clone()
    }

    async fn apply(
        &self,
        deployment: &DeploymentSpec,
        step: &DeploymentStep,
        _: bool,
        _: &CancellationToken,
    ) -> Result<BTreeMap<String, ComponentResult>> {
        validate_step(&self.rule, deployment, step)
            .map_err(|_| CoreError::bad_request("invalid deployment step"))?;
        Ok(BTreeMap::new())
    }
}

// ============================================================================
// Conforming provider
// ============================================================================

#[tokio::test]
async fn test_mock_provider_passes_suite() {
    let provider = MockTargetProvider::new(rule());
    run_conformance_suite(&provider).await.unwrap();
    assert!(
        provider.applied().await.is_empty(),
        "conformance checks run as dry runs"
    );
}

#[tokio::test]
async fn test_mock_provider_with_component_type_passes_suite() {
    let provider = MockTargetProvider::new(rule().with_required_component_type("ebpf"));
    run_conformance_suite(&provider).await.unwrap();
}

#[tokio::test]
async fn test_empty_rule_passes_suite() {
    let provider = MockTargetProvider::default();
    required_properties_and_metadata(&provider).await.unwrap();
    any_required_property_missing(&provider).await.unwrap();
    any_required_metadata_missing(&provider).await.unwrap();
}

// ============================================================================
// Non-conforming providers
// ============================================================================

#[tokio::test]
async fn test_provider_skipping_validation_is_caught() {
    let provider = CarelessProvider { rule: rule() };

    // Accepting complete components is fine; accepting incomplete ones is not.
    required_properties_and_metadata(&provider).await.unwrap();
    let err = any_required_property_missing(&provider).await.unwrap_err();
    match err {
        ConformanceError::AcceptedIncompleteComponent {
            provider,
            requirement,
            key,
        } => {
            assert_eq!(provider, "careless");
            assert_eq!(requirement, "property");
            assert_eq!(key, "p1");
        }
        other => panic!("unexpected violation: {}", other),
    }
}

#[tokio::test]
async fn test_wrong_error_kind_and_missing_metadata_check_are_caught() {
    let provider = SloppyProvider { rule: rule() };

    let err = any_required_property_missing(&provider).await.unwrap_err();
    assert!(matches!(
        err,
        ConformanceError::WrongErrorKind {
            kind: ErrorKind::Internal,
            ..
        }
    ));

    let err = any_required_metadata_missing(&provider).await.unwrap_err();
    assert!(matches!(
        err,
        ConformanceError::AcceptedIncompleteComponent {
            requirement: "metadata",
            ..
        }
    ));
    assert!(run_conformance_suite(&provider).await.is_err());
}

#[tokio::test]
async fn test_rejection_without_component_name_is_caught() {
    let provider = TerseProvider { rule: rule() };

    required_properties_and_metadata(&provider).await.unwrap();
    let err = any_required_property_missing(&provider).await.unwrap_err();
    match err {
        ConformanceError::UnnamedComponent {
            provider,
            requirement,
            key,
            ..
        } => {
            assert_eq!(provider, "terse");
            assert_eq!(requirement, "property");
            assert_eq!(key, "p1");
        }
        other => panic!("unexpected violation: {}", other),
    }
    assert!(matches!(
        any_required_metadata_missing(&provider).await,
        Err(ConformanceError::UnnamedComponent { .. })
    ));
}

#[tokio::test]
async fn test_provider_rejecting_everything_is_caught() {
    let provider = MockTargetProvider::new(rule().with_required_properties(["p3"]));
    let strict = StrictProvider { inner: provider };

    let err = required_properties_and_metadata(&strict).await.unwrap_err();
    assert!(matches!(
        err,
        ConformanceError::RejectedCompleteComponent { .. }
    ));
}

/// Advertises a narrower rule than it enforces.
struct StrictProvider {
    inner: MockTargetProvider,
}

#[async_trait]
impl TargetProvider for StrictProvider {
    fn provider_type(&self) -> &'static str {
        "strict"
    }

    fn validation_rule(&self) -> ValidationRule {
        rule()
    }

    async fn apply(
        &self,
        deployment: &DeploymentSpec,
        step: &DeploymentStep,
        is_dry_run: bool,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<String, ComponentResult>> {
        self.inner.apply(deployment, step, is_dry_run, cancel).await
    }
}
