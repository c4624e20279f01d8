// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cancellation helpers.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, Result};

/// Run `fut` unless `cancel` fires first.
///
/// A token that is already cancelled short-circuits before `fut` is polled,
/// so a write wrapped in this helper is never started after cancellation.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled);
    }
    tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(CoreError::Cancelled),
        result = fut => result,
    }
}
