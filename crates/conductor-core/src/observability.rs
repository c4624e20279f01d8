// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Injected observability context.
//!
//! Components receive an [`ObservabilityContext`] at construction instead of
//! reaching for global state. Operations run inside child spans of the
//! context's span; the no-op context produces disabled spans.

use tracing::Span;

#[derive(Debug, Clone)]
pub struct ObservabilityContext {
    span: Span,
}

impl Default for ObservabilityContext {
    fn default() -> Self {
        Self::noop()
    }
}

impl ObservabilityContext {
    /// Context rooted at a new span named after the owning component.
    pub fn new(component: &'static str) -> Self {
        Self {
            span: tracing::info_span!("conductor", component),
        }
    }

    /// Wrap an existing span (e.g. a request span from an upstream runner).
    pub fn from_span(span: Span) -> Self {
        Self { span }
    }

    /// Context that records nothing.
    pub fn noop() -> Self {
        Self { span: Span::none() }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Span for a single operation, parented to this context.
    pub fn operation(&self, method: &'static str) -> Span {
        if self.span.is_none() {
            return Span::none();
        }
        tracing::info_span!(parent: &self.span, "operation", method)
    }
}
