// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Provider-agnostic conformance checks for the validation contract.
//!
//! Each check builds deployments from the provider's own
//! [`ValidationRule`](crate::ValidationRule) and calls `apply` in dry-run
//! mode, so it can be pointed at any [`TargetProvider`] without touching
//! real infrastructure.
//!
//! ```ignore
//! #[tokio::test]
//! async fn my_provider_conforms() {
//!     let provider = MyProvider::new(test_config());
//!     conductor_targets::conformance::run_conformance_suite(&provider)
//!         .await
//!         .unwrap();
//! }
//! ```

use conductor_core::{
    ComponentAction, ComponentSpec, ComponentStep, CoreError, DeploymentSpec, DeploymentStep,
    ErrorKind, SolutionSpec,
};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::provider::TargetProvider;
use crate::validation::ValidationRule;

const COMPONENT_NAME: &str = "conformance-component";
const SOLUTION_NAME: &str = "conformance-solution";

/// A way in which a provider breaks the validation contract.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConformanceError {
    /// A component meeting every requirement was rejected.
    #[error("provider '{provider}' rejected a component meeting every requirement: {source}")]
    RejectedCompleteComponent {
        provider: &'static str,
        #[source]
        source: CoreError,
    },

    /// A component missing a requirement was accepted.
    #[error("provider '{provider}' accepted a component missing required {requirement} '{key}'")]
    AcceptedIncompleteComponent {
        provider: &'static str,
        requirement: &'static str,
        key: String,
    },

    /// A missing requirement was rejected without naming the component.
    #[error(
        "provider '{provider}' rejected missing {requirement} '{key}' without naming component '{component}': {source}"
    )]
    UnnamedComponent {
        provider: &'static str,
        requirement: &'static str,
        key: String,
        component: &'static str,
        #[source]
        source: CoreError,
    },

    /// A missing requirement was rejected with the wrong error kind.
    #[error(
        "provider '{provider}' rejected missing {requirement} '{key}' with {kind} instead of BadRequest: {source}"
    )]
    WrongErrorKind {
        provider: &'static str,
        requirement: &'static str,
        key: String,
        kind: ErrorKind,
        #[source]
        source: CoreError,
    },
}

/// Result type for conformance checks.
pub type Result<T> = std::result::Result<T, ConformanceError>;

fn component_for(rule: &ValidationRule) -> ComponentSpec {
    let mut component = ComponentSpec::new(
        COMPONENT_NAME,
        rule.required_component_type().unwrap_or_default(),
    );
    for key in rule.required_properties() {
        component
            .properties
            .insert(key.clone(), Value::String("dummy property".to_string()));
    }
    for key in rule.required_metadata() {
        component
            .metadata
            .insert(key.clone(), "dummy metadata".to_string());
    }
    component
}

/// Deployment whose window holds `component`, and a step naming it.
///
/// The step carries `snapshot` as its embedded copy.
fn deployment_and_step(
    component: ComponentSpec,
    snapshot: ComponentSpec,
) -> (DeploymentSpec, DeploymentStep) {
    let deployment = DeploymentSpec {
        solution_name: SOLUTION_NAME.to_string(),
        solution: SolutionSpec {
            components: vec![component],
            ..SolutionSpec::default()
        },
        component_start_index: 0,
        component_end_index: 1,
        ..DeploymentSpec::default()
    };
    let step = DeploymentStep {
        is_first: true,
        components: vec![ComponentStep {
            action: ComponentAction::Update,
            component: snapshot,
        }],
        ..DeploymentStep::default()
    };
    (deployment, step)
}

/// A step whose component meets every requirement must be accepted.
pub async fn required_properties_and_metadata<P: TargetProvider>(provider: &P) -> Result<()> {
    let component = component_for(&provider.validation_rule());
    let (deployment, step) = deployment_and_step(component.clone(), component);

    provider
        .apply(&deployment, &step, true, &CancellationToken::new())
        .await
        .map_err(|source| ConformanceError::RejectedCompleteComponent {
            provider: provider.provider_type(),
            source,
        })?;
    Ok(())
}

/// For each required property, a component missing exactly that one must be
/// rejected with a `BadRequest` naming the component.
pub async fn any_required_property_missing<P: TargetProvider>(provider: &P) -> Result<()> {
    let rule = provider.validation_rule();
    for key in rule.required_properties() {
        let mut component = component_for(&rule);
        component.properties.remove(key);
        expect_rejection(provider, component, "property", key).await?;
    }
    Ok(())
}

/// For each required metadata key, a component missing exactly that one
/// must be rejected with a `BadRequest` naming the component.
pub async fn any_required_metadata_missing<P: TargetProvider>(provider: &P) -> Result<()> {
    let rule = provider.validation_rule();
    for key in rule.required_metadata() {
        let mut component = component_for(&rule);
        component.metadata.remove(key);
        expect_rejection(provider, component, "metadata", key).await?;
    }
    Ok(())
}

async fn expect_rejection<P: TargetProvider>(
    provider: &P,
    component: ComponentSpec,
    requirement: &'static str,
    key: &str,
) -> Result<()> {
    // The step only names the component; the deployment carries the
    // incomplete copy.
    let snapshot = ComponentSpec::new(COMPONENT_NAME, component.component_type.clone());
    let (deployment, step) = deployment_and_step(component, snapshot);

    match provider
        .apply(&deployment, &step, true, &CancellationToken::new())
        .await
    {
        Ok(_) => Err(ConformanceError::AcceptedIncompleteComponent {
            provider: provider.provider_type(),
            requirement,
            key: key.to_string(),
        }),
        Err(source)
            if source.kind() == ErrorKind::BadRequest
                && !source.to_string().contains(COMPONENT_NAME) =>
        {
            Err(ConformanceError::UnnamedComponent {
                provider: provider.provider_type(),
                requirement,
                key: key.to_string(),
                component: COMPONENT_NAME,
                source,
            })
        }
        Err(source) if source.kind() == ErrorKind::BadRequest => {
            debug!(
                provider = provider.provider_type(),
                requirement, key, "Missing requirement rejected"
            );
            Ok(())
        }
        Err(source) => Err(ConformanceError::WrongErrorKind {
            provider: provider.provider_type(),
            requirement,
            key: key.to_string(),
            kind: source.kind(),
            source,
        }),
    }
}

/// Run every conformance check, stopping at the first violation.
pub async fn run_conformance_suite<P: TargetProvider>(provider: &P) -> Result<()> {
    required_properties_and_metadata(provider).await?;
    any_required_property_missing(provider).await?;
    any_required_metadata_missing(provider).await?;
    Ok(())
}
