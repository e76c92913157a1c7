// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dead-letter storage for permanently failed events.

use async_trait::async_trait;

use crate::error::NotebotError;
use crate::types::{Event, FailureRecord};

/// Append-only record of failed events.
#[async_trait]
pub trait FailureSink: Send + Sync {
    /// Records the failure and removes the event from the live queue atomically.
    async fn dead_letter(&self, event: &Event, error_detail: &str) -> Result<i64, NotebotError>;

    /// Lists failures, oldest first.
    async fn list_failures(&self, limit: Option<usize>) -> Result<Vec<FailureRecord>, NotebotError>;

    async fn get_failure(&self, id: i64) -> Result<Option<FailureRecord>, NotebotError>;

    /// Re-enqueues the preserved payload as a fresh event and drops the record.
    ///
    /// Returns the new event id, or `None` when no record has that id.
    async fn replay_failure(&self, id: i64) -> Result<Option<i64>, NotebotError>;
}
