// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Declared component requirements and deployment step validation.

use std::collections::BTreeSet;

use conductor_core::{ComponentSpec, CoreError, DeploymentSpec, DeploymentStep, Result};
use serde::{Deserialize, Serialize};

/// Requirements a target provider places on every component it applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default)]
    required_properties: BTreeSet<String>,
    #[serde(default)]
    required_metadata: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    required_component_type: Option<String>,
}

impl ValidationRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_required_properties<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_properties
            .extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_required_metadata<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_metadata.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_required_component_type(mut self, component_type: impl Into<String>) -> Self {
        self.required_component_type = Some(component_type.into());
        self
    }

    pub fn required_properties(&self) -> &BTreeSet<String> {
        &self.required_properties
    }

    pub fn required_metadata(&self) -> &BTreeSet<String> {
        &self.required_metadata
    }

    pub fn required_component_type(&self) -> Option<&str> {
        self.required_component_type.as_deref()
    }

    /// Check one component against the rule.
    pub fn validate_component(&self, component: &ComponentSpec) -> Result<()> {
        if let Some(expected) = &self.required_component_type
            && component.component_type != *expected
        {
            return Err(CoreError::bad_request(format!(
                "component '{}' has type '{}', expected '{}'",
                component.name, component.component_type, expected
            )));
        }

        let missing: Vec<&str> = self
            .required_properties
            .iter()
            .filter(|key| !component.properties.contains_key(key.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::bad_request(format!(
                "component '{}' is missing required properties: {}",
                component.name,
                missing.join(", ")
            )));
        }

        let missing: Vec<&str> = self
            .required_metadata
            .iter()
            .filter(|key| !component.metadata.contains_key(key.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::bad_request(format!(
                "component '{}' is missing required metadata: {}",
                component.name,
                missing.join(", ")
            )));
        }

        Ok(())
    }
}

/// Validate every component named by `step` against `rule`.
///
/// A step component is checked in its deployment form when a component of
/// the same name lies in the window
/// `solution.components[component_start_index..component_end_index]`,
/// and in the snapshot carried by the step otherwise. Must run before a
/// provider touches anything, dry run or not.
pub fn validate_step(
    rule: &ValidationRule,
    deployment: &DeploymentSpec,
    step: &DeploymentStep,
) -> Result<()> {
    let window = deployment_window(deployment)?;

    for component_step in &step.components {
        let snapshot = &component_step.component;
        let component = window
            .iter()
            .find(|c| c.name == snapshot.name)
            .unwrap_or(snapshot);
        rule.validate_component(component)?;
    }
    Ok(())
}

fn deployment_window(deployment: &DeploymentSpec) -> Result<&[ComponentSpec]> {
    let components = &deployment.solution.components;
    let (start, end) = (
        deployment.component_start_index,
        deployment.component_end_index,
    );
    if start > end || end > components.len() {
        return Err(CoreError::bad_request(format!(
            "component window [{}, {}) is out of range for {} components",
            start,
            end,
            components.len()
        )));
    }
    Ok(&components[start..end])
}
