// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Patch request parsing.
//!
//! A request arrives as a flat JSON object:
//!
//! ```json
//! {
//!   "objectType": "solution",
//!   "objectName": "solution1",
//!   "patchSource": "catalog",
//!   "patchContent": "catalog1",
//!   "component": "ebpf-module",
//!   "property": "input",
//!   "subKey": "adapter",
//!   "dedupKey": "name",
//!   "patchAction": "add"
//! }
//! ```
//!
//! Empty strings count as absent for the optional keys.

use std::fmt;
use std::str::FromStr;

use conductor_core::{CoreError, Result};
use serde_json::{Map, Value};

/// Kind of object a patch applies to. Only solutions are patchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Solution,
}

impl FromStr for ObjectKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "solution" => Ok(ObjectKind::Solution),
            other => Err(CoreError::bad_request(format!(
                "unsupported objectType '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Solution => write!(f, "solution"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchAction {
    Add,
    Remove,
}

impl FromStr for PatchAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(PatchAction::Add),
            "remove" => Ok(PatchAction::Remove),
            other => Err(CoreError::bad_request(format!(
                "unsupported patchAction '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchAction::Add => write!(f, "add"),
            PatchAction::Remove => write!(f, "remove"),
        }
    }
}

/// Where the patch payload comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchSource {
    /// Payload carried in the request itself.
    Inline(Value),
    /// Name of a catalog whose `properties` bag is the payload.
    Catalog(String),
}

/// Address of an array-valued property inside one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    pub component: String,
    pub property: String,
    pub sub_key: Option<String>,
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.component, self.property)?;
        if let Some(sub_key) = &self.sub_key {
            write!(f, "[{}]", sub_key)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchRequest {
    pub object_kind: ObjectKind,
    pub object_name: String,
    pub source: PatchSource,
    /// `None` patches whole components.
    pub target: Option<PropertyPath>,
    pub dedup_key: Option<String>,
    pub action: PatchAction,
}

impl PatchRequest {
    /// Parse a request from its JSON object form.
    pub fn from_inputs(inputs: &Map<String, Value>) -> Result<Self> {
        let object_kind: ObjectKind = required_str(inputs, "objectType")?.parse()?;
        let object_name = required_str(inputs, "objectName")?.to_string();
        let action: PatchAction = required_str(inputs, "patchAction")?.parse()?;

        let source = match required_str(inputs, "patchSource")? {
            "inline" => match inputs.get("patchContent") {
                None | Some(Value::Null) => {
                    return Err(CoreError::bad_request("patchContent is required"));
                }
                Some(content) => PatchSource::Inline(content.clone()),
            },
            "catalog" => PatchSource::Catalog(required_str(inputs, "patchContent")?.to_string()),
            other => {
                return Err(CoreError::bad_request(format!(
                    "unsupported patchSource '{}'",
                    other
                )));
            }
        };

        let component = optional_str(inputs, "component")?;
        let property = optional_str(inputs, "property")?;
        let sub_key = optional_str(inputs, "subKey")?;

        let target = match (component, property) {
            (Some(component), Some(property)) => Some(PropertyPath {
                component: component.to_string(),
                property: property.to_string(),
                sub_key: sub_key.map(str::to_string),
            }),
            (Some(component), None) => {
                return Err(CoreError::bad_request(format!(
                    "property is required when patching component '{}'",
                    component
                )));
            }
            (None, Some(_)) => {
                return Err(CoreError::bad_request(
                    "component is required when property is set",
                ));
            }
            (None, None) if sub_key.is_some() => {
                return Err(CoreError::bad_request(
                    "subKey requires component and property",
                ));
            }
            (None, None) => None,
        };

        Ok(Self {
            object_kind,
            object_name,
            source,
            target,
            dedup_key: optional_str(inputs, "dedupKey")?.map(str::to_string),
            action,
        })
    }
}

fn optional_str<'a>(inputs: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match inputs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(CoreError::bad_request(format!(
            "{} must be a string, got {}",
            key, other
        ))),
    }
}

fn required_str<'a>(inputs: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    optional_str(inputs, key)?
        .ok_or_else(|| CoreError::bad_request(format!("{} is required", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inputs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("inputs must be an object"),
        }
    }

    #[test]
    fn test_parse_catalog_property_request() {
        let request = PatchRequest::from_inputs(&inputs(json!({
            "objectType": "solution",
            "objectName": "solution1",
            "patchSource": "catalog",
            "patchContent": "catalog1",
            "patchAction": "add",
            "component": "ebpf-module",
            "property": "input",
            "subKey": "adapter"
        })))
        .unwrap();

        assert_eq!(request.object_kind, ObjectKind::Solution);
        assert_eq!(request.source, PatchSource::Catalog("catalog1".to_string()));
        assert_eq!(request.action, PatchAction::Add);
        let target = request.target.unwrap();
        assert_eq!(target.to_string(), "ebpf-module:input[adapter]");
        assert!(request.dedup_key.is_none());
    }

    #[test]
    fn test_empty_optional_keys_are_absent() {
        let request = PatchRequest::from_inputs(&inputs(json!({
            "objectType": "solution",
            "objectName": "test-app",
            "patchSource": "catalog",
            "patchContent": "ai-config",
            "component": "frontend",
            "property": "deployment.replicas",
            "subKey": "",
            "dedupKey": "flavor",
            "patchAction": "add"
        })))
        .unwrap();

        let target = request.target.unwrap();
        assert_eq!(target.sub_key, None);
        assert_eq!(request.dedup_key.as_deref(), Some("flavor"));
    }

    #[test]
    fn test_inline_whole_component() {
        let request = PatchRequest::from_inputs(&inputs(json!({
            "objectType": "solution",
            "objectName": "solution1",
            "patchSource": "inline",
            "patchContent": {"name": "ebpf-module", "type": "ebpf"},
            "patchAction": "remove"
        })))
        .unwrap();

        assert!(request.target.is_none());
        assert_eq!(request.action, PatchAction::Remove);
        assert!(matches!(request.source, PatchSource::Inline(_)));
    }

    #[test]
    fn test_rejects_malformed_requests() {
        let base = json!({
            "objectType": "solution",
            "objectName": "solution1",
            "patchSource": "inline",
            "patchContent": {"name": "c"},
            "patchAction": "add"
        });

        let mutations: Vec<(&str, Value)> = vec![
            ("objectType", json!("instance")),
            ("objectName", json!("")),
            ("patchAction", json!("merge")),
            ("patchSource", json!("git")),
            ("patchContent", Value::Null),
            ("component", json!(42)),
        ];

        for (key, value) in mutations {
            let mut map = inputs(base.clone());
            map.insert(key.to_string(), value);
            let err = PatchRequest::from_inputs(&map).unwrap_err();
            assert!(
                matches!(err, CoreError::BadRequest(_)),
                "{} should be rejected, got {:?}",
                key,
                err
            );
        }
    }

    #[test]
    fn test_rejects_partial_paths() {
        let mut map = inputs(json!({
            "objectType": "solution",
            "objectName": "solution1",
            "patchSource": "inline",
            "patchContent": {},
            "patchAction": "add",
            "component": "frontend"
        }));
        assert!(PatchRequest::from_inputs(&map).is_err());

        map.remove("component");
        map.insert("property".to_string(), json!("input"));
        assert!(PatchRequest::from_inputs(&map).is_err());

        map.remove("property");
        map.insert("subKey".to_string(), json!("adapter"));
        assert!(PatchRequest::from_inputs(&map).is_err());
    }

    #[test]
    fn test_catalog_source_requires_name() {
        let map = inputs(json!({
            "objectType": "solution",
            "objectName": "solution1",
            "patchSource": "catalog",
            "patchContent": {"not": "a name"},
            "patchAction": "add"
        }));
        assert!(matches!(
            PatchRequest::from_inputs(&map),
            Err(CoreError::BadRequest(_))
        ));
    }
}
