// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Spec types shared by every conductor crate.
//!
//! All types serialize in camelCase so they match the control-plane wire
//! format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scope used when a caller does not name one.
pub const DEFAULT_SCOPE: &str = "default";

/// API group for solutions, instances and targets.
pub const SOLUTION_GROUP: &str = "solution.conductor.io";

/// API group for catalogs.
pub const FEDERATION_GROUP: &str = "federation.conductor.io";

/// Resolve an optional or empty scope to the default scope.
pub fn normalize_scope(scope: &str) -> &str {
    if scope.is_empty() {
        DEFAULT_SCOPE
    } else {
        scope
    }
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

/// A named, typed deployable unit inside a solution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub component_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component_type: component_type.into(),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// An ordered tree of components deployed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    /// Optimistic-concurrency generation, mirrored into the store ETag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
}

impl Default for SolutionSpec {
    fn default() -> Self {
        Self {
            display_name: None,
            scope: default_scope(),
            metadata: BTreeMap::new(),
            components: Vec::new(),
            generation: None,
        }
    }
}

impl SolutionSpec {
    pub fn component(&self, name: &str) -> Option<&ComponentSpec> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut ComponentSpec> {
        self.components.iter_mut().find(|c| c.name == name)
    }
}

/// A reusable, named property bag resolved by reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSpec {
    /// Registry bodies may omit it.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub catalog_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
}

/// Selects the target an instance is deployed to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, String>,
}

/// Binds a solution to a target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub solution: String,
    #[serde(default)]
    pub target: TargetSelector,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
}

/// What a deployment step does with a component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentAction {
    #[default]
    Update,
    Delete,
}

/// A component snapshot carried by a deployment step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStep {
    #[serde(default)]
    pub action: ComponentAction,
    pub component: ComponentSpec,
}

/// The set of components one target provider applies in one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStep {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub is_first: bool,
    #[serde(default)]
    pub components: Vec<ComponentStep>,
}

/// A solution being deployed, with the window of components in play.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    #[serde(default)]
    pub solution_name: String,
    #[serde(default)]
    pub solution: SolutionSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    /// First component of the window (inclusive).
    #[serde(default)]
    pub component_start_index: usize,
    /// End of the window (exclusive).
    #[serde(default)]
    pub component_end_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<String>,
}

/// Envelope returned by the control plane for a stored object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectState<T> {
    pub id: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    pub spec: Option<T>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub status: BTreeMap<String, String>,
}
