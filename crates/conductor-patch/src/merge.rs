// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pure merge operations on a solution's component tree.
//!
//! Nothing here does I/O; the engine fetches, calls these, and writes back.

use conductor_core::{ComponentSpec, CoreError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::request::PropertyPath;

/// How `remove` decides which array elements match the fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemovalMatch {
    /// Element must equal the fragment structurally.
    #[default]
    Exact,
    /// Element matches when its `dedupKey` value equals the fragment's.
    /// Falls back to `Exact` for requests without a `dedupKey`.
    DedupKey,
}

/// What a patch did to the component tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Change {
    Appended,
    Replaced,
    Removed(usize),
    Unchanged,
}

impl Change {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Change::Unchanged | Change::Removed(0))
    }
}

/// Append `component`, or replace in place the component with the same name.
pub fn upsert_component(components: &mut Vec<ComponentSpec>, component: ComponentSpec) -> Change {
    match components.iter_mut().find(|c| c.name == component.name) {
        Some(existing) if *existing == component => Change::Unchanged,
        Some(existing) => {
            *existing = component;
            Change::Replaced
        }
        None => {
            components.push(component);
            Change::Appended
        }
    }
}

/// Remove the component named `name`.
pub fn remove_component(components: &mut Vec<ComponentSpec>, name: &str) -> Result<ComponentSpec> {
    let index = components
        .iter()
        .position(|c| c.name == name)
        .ok_or_else(|| CoreError::not_found("component", name))?;
    Ok(components.remove(index))
}

/// Resolve the array addressed by `path` inside the component's properties.
///
/// `property` is first looked up as a literal key (property names such as
/// `ebpf.name` contain dots); when absent and dotted, it is walked as a
/// nested path. `sub_key` then selects one key below that object.
pub fn resolve_array<'a>(
    components: &'a mut [ComponentSpec],
    path: &PropertyPath,
) -> Result<&'a mut Vec<Value>> {
    let component = components
        .iter_mut()
        .find(|c| c.name == path.component)
        .ok_or_else(|| CoreError::not_found("component", &path.component))?;

    let mut value = lookup_mut(&mut component.properties, &path.property).ok_or_else(|| {
        CoreError::bad_request(format!(
            "property '{}' not found on component '{}'",
            path.property, path.component
        ))
    })?;

    if let Some(sub_key) = &path.sub_key {
        value = value
            .as_object_mut()
            .ok_or_else(|| {
                CoreError::bad_request(format!(
                    "property '{}' on component '{}' is not an object",
                    path.property, path.component
                ))
            })?
            .get_mut(sub_key)
            .ok_or_else(|| {
                CoreError::bad_request(format!(
                    "sub-key '{}' not found under '{}' on component '{}'",
                    sub_key, path.property, path.component
                ))
            })?;
    }

    value
        .as_array_mut()
        .ok_or_else(|| CoreError::bad_request(format!("'{}' is not an array", path)))
}

fn lookup_mut<'a>(properties: &'a mut Map<String, Value>, property: &str) -> Option<&'a mut Value> {
    if properties.contains_key(property) {
        return properties.get_mut(property);
    }
    let mut segments = property.split('.');
    let mut current = properties.get_mut(segments.next()?)?;
    for segment in segments {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

/// Add `fragment` to `array`.
///
/// With a `dedup_key`, the first element whose value at that key equals the
/// fragment's is replaced instead of appending a duplicate.
pub fn add_element(array: &mut Vec<Value>, fragment: Value, dedup_key: Option<&str>) -> Result<Change> {
    let Some(key) = dedup_key else {
        array.push(fragment);
        return Ok(Change::Appended);
    };

    let identity = dedup_identity(&fragment, key)?.clone();
    match array
        .iter_mut()
        .find(|element| element.get(key) == Some(&identity))
    {
        Some(existing) if *existing == fragment => Ok(Change::Unchanged),
        Some(existing) => {
            *existing = fragment;
            Ok(Change::Replaced)
        }
        None => {
            array.push(fragment);
            Ok(Change::Appended)
        }
    }
}

/// Remove every element of `array` that matches `fragment` under `policy`.
pub fn remove_elements(
    array: &mut Vec<Value>,
    fragment: &Value,
    dedup_key: Option<&str>,
    policy: RemovalMatch,
) -> Result<Change> {
    let before = array.len();
    match (policy, dedup_key) {
        (RemovalMatch::DedupKey, Some(key)) => {
            let identity = dedup_identity(fragment, key)?;
            array.retain(|element| element.get(key) != Some(identity));
        }
        _ => array.retain(|element| element != fragment),
    }
    Ok(Change::Removed(before - array.len()))
}

fn dedup_identity<'a>(fragment: &'a Value, key: &str) -> Result<&'a Value> {
    fragment.get(key).ok_or_else(|| {
        CoreError::bad_request(format!("patch fragment has no dedupKey field '{}'", key))
    })
}

/// Collapse an inline payload into one structured array element.
///
/// A component-shaped object (`name` plus `properties`) contributes its
/// property bag; any other object is used as is.
pub fn inline_fragment(content: &Value) -> Result<Value> {
    match content {
        Value::Object(map) if map.contains_key("name") => match map.get("properties") {
            Some(properties @ Value::Object(_)) => Ok(properties.clone()),
            _ => Ok(content.clone()),
        },
        Value::Object(_) => Ok(content.clone()),
        other => Err(CoreError::bad_request(format!(
            "inline patchContent must be an object, got {}",
            other
        ))),
    }
}

/// Decode a whole-component payload.
pub fn component_payload(content: Value) -> Result<ComponentSpec> {
    let component: ComponentSpec = serde_json::from_value(content)
        .map_err(|e| CoreError::bad_request(format!("patchContent is not a component: {}", e)))?;
    if component.name.is_empty() {
        return Err(CoreError::bad_request("component name must not be empty"));
    }
    Ok(component)
}
