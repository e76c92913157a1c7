// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locating the downloaded file behind a file-bearing event.

use std::path::PathBuf;

use notebot_core::{DownloadTask, Event, NotebotError};
use tokio::time::Instant;
use tracing::debug;

use crate::context::HandlerContext;

fn missing(event: &Event, detail: impl Into<String>) -> NotebotError {
    NotebotError::MissingAsset {
        event_id: event.id,
        detail: detail.into(),
    }
}

/// Waits for the event's download task to complete.
///
/// Fails with [`NotebotError::MissingAsset`] when no task is linked, when
/// the fetch failed, or when `asset_wait` elapses first.
pub async fn wait_for_download(
    ctx: &HandlerContext,
    event: &Event,
) -> Result<DownloadTask, NotebotError> {
    let task_id = event
        .download_task_id
        .ok_or_else(|| missing(event, "no download task linked"))?;
    let deadline = Instant::now() + ctx.asset_wait;

    loop {
        let task = ctx
            .store
            .get_download_task(task_id)
            .await?
            .ok_or_else(|| missing(event, format!("download task {task_id} does not exist")))?;

        if task.completed {
            return Ok(task);
        }
        if let Some(error) = task.last_error.as_deref() {
            return Err(missing(event, format!("download failed: {error}")));
        }
        if Instant::now() >= deadline {
            return Err(missing(
                event,
                format!(
                    "download task {task_id} not completed after {}s",
                    ctx.asset_wait.as_secs_f64()
                ),
            ));
        }
        debug!(event_id = event.id, task_id, "waiting for download");
        tokio::time::sleep(ctx.asset_poll).await;
    }
}

/// The local file of a completed task, checked to exist on disk.
pub async fn local_file(event: &Event, task: &DownloadTask) -> Result<PathBuf, NotebotError> {
    let path = task
        .local_path
        .as_deref()
        .map(PathBuf::from)
        .ok_or_else(|| missing(event, format!("download task {} has no local path", task.id)))?;
    match tokio::fs::try_exists(&path).await {
        Ok(true) => Ok(path),
        Ok(false) => Err(missing(event, format!("{} is gone", path.display()))),
        Err(source) => Err(NotebotError::Io { path, source }),
    }
}
