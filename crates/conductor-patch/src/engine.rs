// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Patch engine: fetch, merge, write back.

use std::sync::Arc;

use conductor_core::{CoreError, ObservabilityContext, Result, SolutionSpec};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info};

use crate::merge::{self, Change, RemovalMatch};
use crate::object_api::ObjectApi;
use crate::request::{PatchAction, PatchRequest, PatchSource};

/// Result of a successful patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOutcome {
    pub status: &'static str,
    pub object_type: String,
    pub object_name: String,
    pub patch_action: String,
    pub change: Change,
    /// False when the patch left the solution as it was and nothing was
    /// written.
    pub written: bool,
}

/// Applies patch requests to solutions through an [`ObjectApi`].
///
/// Each request is one read-modify-write against the fetched generation.
/// A concurrent writer makes the write fail with [`CoreError::Conflict`];
/// the engine never retries.
#[derive(Clone)]
pub struct PatchEngine {
    api: Arc<dyn ObjectApi>,
    removal_match: RemovalMatch,
    context: ObservabilityContext,
}

impl PatchEngine {
    pub fn new(api: Arc<dyn ObjectApi>) -> Self {
        Self {
            api,
            removal_match: RemovalMatch::default(),
            context: ObservabilityContext::noop(),
        }
    }

    /// Set how property `remove` matches array elements.
    pub fn with_removal_match(mut self, removal_match: RemovalMatch) -> Self {
        self.removal_match = removal_match;
        self
    }

    pub fn with_context(mut self, context: ObservabilityContext) -> Self {
        self.context = context;
        self
    }

    /// Parse `inputs` as a patch request, apply it, and return the outputs
    /// map (`{"status": "OK", ...}`).
    pub async fn process(
        &self,
        inputs: &Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<Map<String, Value>> {
        let request = PatchRequest::from_inputs(inputs)?;
        let outcome = self
            .apply(&request, cancel)
            .instrument(self.context.operation("Process"))
            .await?;

        match serde_json::to_value(outcome)? {
            Value::Object(outputs) => Ok(outputs),
            other => Err(CoreError::internal(
                "encode outputs",
                format!("expected an object, got {}", other),
            )),
        }
    }

    pub async fn apply(
        &self,
        request: &PatchRequest,
        cancel: &CancellationToken,
    ) -> Result<PatchOutcome> {
        let name = request.object_name.as_str();

        let mut solution = self.api.fetch_solution(name, cancel).await?;
        let payload = self.resolve_payload(request, cancel).await?;
        let change = self.merge(&mut solution, request, payload)?;

        let written = !change.is_unchanged();
        if written {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            self.api.replace_solution(name, &solution, cancel).await?;
            info!(
                solution = %name,
                action = %request.action,
                change = ?change,
                "Solution patched"
            );
        } else {
            debug!(solution = %name, action = %request.action, "Patch left solution unchanged");
        }

        Ok(PatchOutcome {
            status: "OK",
            object_type: request.object_kind.to_string(),
            object_name: name.to_string(),
            patch_action: request.action.to_string(),
            change,
            written,
        })
    }

    async fn resolve_payload(
        &self,
        request: &PatchRequest,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        match &request.source {
            PatchSource::Inline(content) => Ok(content.clone()),
            PatchSource::Catalog(catalog) => {
                let catalog = self.api.fetch_catalog(catalog, cancel).await?;
                Ok(Value::Object(catalog.properties))
            }
        }
    }

    fn merge(
        &self,
        solution: &mut SolutionSpec,
        request: &PatchRequest,
        payload: Value,
    ) -> Result<Change> {
        let Some(path) = &request.target else {
            let component = merge::component_payload(payload)?;
            return match request.action {
                PatchAction::Add => Ok(merge::upsert_component(&mut solution.components, component)),
                PatchAction::Remove => {
                    merge::remove_component(&mut solution.components, &component.name)?;
                    Ok(Change::Removed(1))
                }
            };
        };

        let fragment = match request.source {
            PatchSource::Inline(_) => merge::inline_fragment(&payload)?,
            PatchSource::Catalog(_) => payload,
        };
        let array = merge::resolve_array(&mut solution.components, path)?;
        let dedup_key = request.dedup_key.as_deref();

        match request.action {
            PatchAction::Add => merge::add_element(array, fragment, dedup_key),
            PatchAction::Remove => {
                merge::remove_elements(array, &fragment, dedup_key, self.removal_match)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conductor_core::{CatalogSpec, ComponentSpec};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory object API that counts writes.
    #[derive(Default)]
    struct RecordingApi {
        solution: Mutex<Option<SolutionSpec>>,
        catalog: Option<CatalogSpec>,
        writes: AtomicUsize,
        cancel_on_fetch: Option<CancellationToken>,
    }

    #[async_trait]
    impl ObjectApi for RecordingApi {
        async fn fetch_solution(&self, name: &str, _: &CancellationToken) -> Result<SolutionSpec> {
            if let Some(cancel) = &self.cancel_on_fetch {
                cancel.cancel();
            }
            self.solution
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| CoreError::not_found("solution", name))
        }

        async fn replace_solution(
            &self,
            _: &str,
            spec: &SolutionSpec,
            _: &CancellationToken,
        ) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            *self.solution.lock().unwrap() = Some(spec.clone());
            Ok(())
        }

        async fn fetch_catalog(&self, name: &str, _: &CancellationToken) -> Result<CatalogSpec> {
            self.catalog
                .clone()
                .ok_or_else(|| CoreError::not_found("catalog", name))
        }
    }

    fn inputs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("inputs must be an object"),
        }
    }

    fn api_with(components: Vec<ComponentSpec>) -> Arc<RecordingApi> {
        Arc::new(RecordingApi {
            solution: Mutex::new(Some(SolutionSpec {
                components,
                ..SolutionSpec::default()
            })),
            ..RecordingApi::default()
        })
    }

    #[tokio::test]
    async fn test_process_reports_ok() {
        let api = api_with(vec![]);
        let engine = PatchEngine::new(api.clone());

        let outputs = engine
            .process(
                &inputs(json!({
                    "objectType": "solution",
                    "objectName": "solution1",
                    "patchSource": "inline",
                    "patchContent": {"name": "frontend", "type": "container"},
                    "patchAction": "add"
                })),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outputs["status"], "OK");
        assert_eq!(outputs["objectName"], "solution1");
        assert_eq!(outputs["change"], "appended");
        assert_eq!(outputs["written"], true);
        assert_eq!(api.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_solution_is_not_found() {
        let api = Arc::new(RecordingApi::default());
        let engine = PatchEngine::new(api.clone());

        let err = engine
            .process(
                &inputs(json!({
                    "objectType": "solution",
                    "objectName": "ghost",
                    "patchSource": "inline",
                    "patchContent": {"name": "frontend"},
                    "patchAction": "add"
                })),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "solution 'ghost' not found");
        assert_eq!(api.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_to_missing_component_fails_without_write() {
        let api = api_with(vec![ComponentSpec::new("frontend", "container")]);
        let engine = PatchEngine::new(api.clone());

        let err = engine
            .process(
                &inputs(json!({
                    "objectType": "solution",
                    "objectName": "solution1",
                    "patchSource": "inline",
                    "patchContent": {"k": "v"},
                    "component": "backend",
                    "property": "env",
                    "patchAction": "add"
                })),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(api.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unchanged_patch_skips_write() {
        let api = api_with(vec![
            ComponentSpec::new("frontend", "container").with_property("env", json!([]))
        ]);
        let engine = PatchEngine::new(api.clone());

        let outcome = engine
            .process(
                &inputs(json!({
                    "objectType": "solution",
                    "objectName": "solution1",
                    "patchSource": "inline",
                    "patchContent": {"k": "v"},
                    "component": "frontend",
                    "property": "env",
                    "patchAction": "remove"
                })),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome["written"], false);
        assert_eq!(api.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_observed_before_write() {
        let cancel = CancellationToken::new();
        let api = Arc::new(RecordingApi {
            solution: Mutex::new(Some(SolutionSpec::default())),
            cancel_on_fetch: Some(cancel.clone()),
            ..RecordingApi::default()
        });
        let engine = PatchEngine::new(api.clone());

        let err = engine
            .process(
                &inputs(json!({
                    "objectType": "solution",
                    "objectName": "solution1",
                    "patchSource": "inline",
                    "patchContent": {"name": "frontend"},
                    "patchAction": "add"
                })),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Cancelled));
        assert_eq!(api.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_removal_by_dedup_key_policy() {
        let component = ComponentSpec::new("gateway", "proxy").with_property(
            "routes",
            json!([{"path": "/a", "port": 80}, {"path": "/b", "port": 81}]),
        );
        let request = inputs(json!({
            "objectType": "solution",
            "objectName": "solution1",
            "patchSource": "inline",
            "patchContent": {"path": "/a", "port": 9999},
            "component": "gateway",
            "property": "routes",
            "dedupKey": "path",
            "patchAction": "remove"
        }));

        let exact = api_with(vec![component.clone()]);
        PatchEngine::new(exact.clone())
            .process(&request, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(exact.writes.load(Ordering::SeqCst), 0);

        let by_key = api_with(vec![component]);
        PatchEngine::new(by_key.clone())
            .with_removal_match(RemovalMatch::DedupKey)
            .process(&request, &CancellationToken::new())
            .await
            .unwrap();
        let stored = by_key.solution.lock().unwrap().clone().unwrap();
        assert_eq!(
            stored.components[0].properties["routes"],
            json!([{"path": "/b", "port": 81}])
        );
    }

    #[tokio::test]
    async fn test_catalog_whole_component() {
        let api = Arc::new(RecordingApi {
            solution: Mutex::new(Some(SolutionSpec::default())),
            catalog: Some(CatalogSpec {
                properties: inputs(json!({"name": "monitor", "type": "daemon"})),
                ..CatalogSpec::default()
            }),
            ..RecordingApi::default()
        });

        PatchEngine::new(api.clone())
            .process(
                &inputs(json!({
                    "objectType": "solution",
                    "objectName": "solution1",
                    "patchSource": "catalog",
                    "patchContent": "monitor-template",
                    "patchAction": "add"
                })),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let stored = api.solution.lock().unwrap().clone().unwrap();
        assert_eq!(stored.components[0].name, "monitor");
        assert_eq!(stored.components[0].component_type, "daemon");
    }
}
