// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conductor Targets - the provider validation contract
//!
//! Target providers declare a [`ValidationRule`] (required property keys,
//! required metadata keys, optionally a component type) and must reject a
//! deployment step that violates it before touching any infrastructure.
//!
//! - [`TargetProvider`]: the provider trait
//! - [`validate_step`]: the shared check providers run first in `apply`
//! - [`MockTargetProvider`]: an in-memory provider for tests
//! - [`conformance`]: generic checks that prove a provider enforces its rule

pub mod conformance;
pub mod mock;
mod provider;
mod validation;

pub use conformance::{ConformanceError, run_conformance_suite};
pub use mock::MockTargetProvider;
pub use provider::{ComponentResult, ComponentStatus, TargetProvider};
pub use validation::{ValidationRule, validate_step};
