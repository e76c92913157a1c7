// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The durable work queue shared by the dealer and the downloader.

use async_trait::async_trait;

use crate::error::NotebotError;
use crate::types::{ClaimRequest, DownloadTask, Event, NewEvent};

/// Queue of events and download tasks with atomic claim semantics.
///
/// Every `claim_*` call transitions each returned document from unclaimed to
/// claimed in one atomic step. Two callers, in this process or another, never
/// receive the same document unless its claim has gone stale.
#[async_trait]
pub trait WorkStore: Send + Sync {
    /// Enqueues an event and returns its id.
    async fn enqueue_event(&self, event: NewEvent) -> Result<i64, NotebotError>;

    /// Enqueues a download task and returns its id.
    async fn enqueue_download(
        &self,
        remote_file_ref: &str,
        expected_size: Option<i64>,
    ) -> Result<i64, NotebotError>;

    /// Enqueues a download task and an event linked to it atomically.
    ///
    /// Returns `(event_id, task_id)`. On error neither row exists.
    async fn enqueue_event_with_download(
        &self,
        event: NewEvent,
        remote_file_ref: &str,
        expected_size: Option<i64>,
    ) -> Result<(i64, i64), NotebotError>;

    /// Claims eligible events, oldest first.
    async fn claim_events(&self, request: &ClaimRequest) -> Result<Vec<Event>, NotebotError>;

    /// Refreshes the claim timestamp of an event still held by `token`.
    ///
    /// Returns `false` when the claim was lost to another consumer.
    async fn renew_event_claim(&self, event_id: i64, token: &str) -> Result<bool, NotebotError>;

    /// Removes an event from the live queue.
    async fn delete_event(&self, event_id: i64) -> Result<(), NotebotError>;

    /// Claims eligible, incomplete download tasks, oldest first.
    ///
    /// Tasks with a recorded fetch failure are not eligible.
    async fn claim_download_tasks(
        &self,
        request: &ClaimRequest,
    ) -> Result<Vec<DownloadTask>, NotebotError>;

    /// Marks a task completed with the location and type of the written file.
    ///
    /// Returns `false` when the task no longer exists, in which case nothing
    /// will ever consume the file.
    async fn complete_download_task(
        &self,
        task_id: i64,
        local_path: &str,
        mime_type: &str,
    ) -> Result<bool, NotebotError>;

    /// Records a fetch failure. The task stays claimed and incomplete.
    async fn fail_download_task(&self, task_id: i64, error: &str) -> Result<(), NotebotError>;

    async fn get_download_task(&self, task_id: i64) -> Result<Option<DownloadTask>, NotebotError>;

    async fn delete_download_task(&self, task_id: i64) -> Result<(), NotebotError>;
}
