// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The FetchWorker poll loop.
//!
//! Claims download tasks with the work store's atomic claim, fetches each
//! one over HTTP with bounded concurrency, and hands the disk write to a
//! bounded blocking pool so slow disks never stall in-flight fetches.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use notebot_config::model::DownloaderConfig;
use notebot_core::{ChatClient, ClaimRequest, DownloadTask, FetchError, NotebotError, WorkStore};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::files;

/// Pause after a failed poll before touching the store again.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

struct FetchContext {
    store: Arc<dyn WorkStore>,
    chat: Arc<dyn ChatClient>,
    http: reqwest::Client,
    download_dir: PathBuf,
    write_pool: Arc<Semaphore>,
}

struct FetchedFile {
    path: PathBuf,
    mime_type: String,
    bytes: u64,
}

/// Downloads claimed tasks to `download_dir`.
pub struct FetchWorker {
    ctx: Arc<FetchContext>,
    claim_token: String,
    poll_interval: Duration,
    claim_timeout: Duration,
    max_in_flight: usize,
}

impl FetchWorker {
    pub fn new(
        store: Arc<dyn WorkStore>,
        chat: Arc<dyn ChatClient>,
        config: &DownloaderConfig,
    ) -> Result<Self, NotebotError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotebotError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            ctx: Arc::new(FetchContext {
                store,
                chat,
                http,
                download_dir: PathBuf::from(&config.download_dir),
                write_pool: Arc::new(Semaphore::new(config.write_workers.max(1))),
            }),
            claim_token: format!("downloader-{}", uuid::Uuid::new_v4()),
            poll_interval: config.poll_interval(),
            claim_timeout: config.claim_timeout(),
            max_in_flight: config.max_concurrent_fetches.max(1),
        })
    }

    pub fn claim_token(&self) -> &str {
        &self.claim_token
    }

    /// Runs until `cancel` fires, then waits for in-flight fetches.
    ///
    /// Store errors are logged and retried; they never end the loop.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), NotebotError> {
        tokio::fs::create_dir_all(&self.ctx.download_dir)
            .await
            .map_err(|source| NotebotError::Io {
                path: self.ctx.download_dir.clone(),
                source,
            })?;

        info!(
            download_dir = %self.ctx.download_dir.display(),
            max_in_flight = self.max_in_flight,
            "fetch worker started"
        );

        let mut in_flight: JoinSet<()> = JoinSet::new();
        loop {
            while let Some(joined) = in_flight.try_join_next() {
                log_join(joined);
            }
            if cancel.is_cancelled() {
                break;
            }

            let capacity = self.max_in_flight.saturating_sub(in_flight.len());
            let (claimed, backoff) = if capacity == 0 {
                (0, self.poll_interval)
            } else {
                match self.claim(capacity).await {
                    Ok(tasks) => {
                        let n = tasks.len();
                        for task in tasks {
                            let ctx = Arc::clone(&self.ctx);
                            in_flight.spawn(async move { ctx.process(task).await });
                        }
                        (n, self.poll_interval)
                    }
                    Err(e) => {
                        error!(error = %e, "download task poll failed");
                        (0, ERROR_BACKOFF)
                    }
                }
            };

            if claimed == 0 {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                    Some(joined) = in_flight.join_next(), if capacity == 0 => log_join(joined),
                }
            }
        }

        if !in_flight.is_empty() {
            info!(count = in_flight.len(), "waiting for in-flight downloads");
        }
        while let Some(joined) = in_flight.join_next().await {
            log_join(joined);
        }
        info!("fetch worker stopped");
        Ok(())
    }

    async fn claim(&self, limit: usize) -> Result<Vec<DownloadTask>, NotebotError> {
        let request = ClaimRequest {
            token: self.claim_token.clone(),
            limit: Some(limit),
            stale_after: self.claim_timeout,
        };
        let tasks = self.ctx.store.claim_download_tasks(&request).await?;
        if !tasks.is_empty() {
            debug!(count = tasks.len(), "claimed download tasks");
        }
        Ok(tasks)
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "download task panicked");
    }
}

impl FetchContext {
    async fn process(&self, task: DownloadTask) {
        let started = Instant::now();
        match self.fetch(&task).await {
            Ok(file) => {
                let local_path = file.path.to_string_lossy();
                match self
                    .store
                    .complete_download_task(task.id, &local_path, &file.mime_type)
                    .await
                {
                    Ok(true) => {
                        notebot_prometheus::record_download("success", file.bytes);
                        info!(
                            task_id = task.id,
                            bytes = file.bytes,
                            mime_type = %file.mime_type,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "download completed"
                        );
                    }
                    Ok(false) => {
                        // Its event was dropped while the fetch ran.
                        notebot_prometheus::record_download("orphaned", file.bytes);
                        info!(task_id = task.id, "download task gone, discarding file");
                        match tokio::fs::remove_file(&file.path).await {
                            Ok(()) => {}
                            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                            Err(e) => warn!(
                                path = %file.path.display(),
                                error = %e,
                                "failed to remove orphaned download"
                            ),
                        }
                    }
                    Err(e) => {
                        // The claim goes stale and the task is fetched again.
                        error!(task_id = task.id, error = %e, "failed to mark download complete");
                    }
                }
            }
            Err(e) => {
                notebot_prometheus::record_download("failed", 0);
                warn!(task_id = task.id, error = %e, "download failed");
                if let Err(store_err) = self.store.fail_download_task(task.id, &e.to_string()).await
                {
                    error!(task_id = task.id, error = %store_err, "failed to record download failure");
                }
            }
        }
    }

    async fn fetch(&self, task: &DownloadTask) -> Result<FetchedFile, NotebotError> {
        let url = self.chat.resolve_file_url(&task.remote_file_ref).await?;
        let shown_url = files::redact_url(&url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| NotebotError::Channel {
                message: format!("download request to {shown_url} failed"),
                source: Some(Box::new(e.without_url())),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError {
                status: status.as_u16(),
                body,
                url: shown_url,
            }
            .into());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let mime_type = files::mime_for(&url, content_type.as_deref());

        let capacity = task
            .expected_size
            .and_then(|s| usize::try_from(s).ok())
            .unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| NotebotError::Channel {
                message: format!("download from {shown_url} interrupted"),
                source: Some(Box::new(e.without_url())),
            })?;
            data.extend_from_slice(&chunk);
        }
        let bytes = data.len() as u64;

        let path = files::local_path(&self.download_dir, task.id, &task.remote_file_ref);
        self.write(path.clone(), data).await?;

        Ok(FetchedFile {
            path,
            mime_type,
            bytes,
        })
    }

    /// Runs the blocking write on the bounded pool.
    async fn write(&self, path: PathBuf, data: Vec<u8>) -> Result<(), NotebotError> {
        let permit = Arc::clone(&self.write_pool)
            .acquire_owned()
            .await
            .map_err(|_| NotebotError::Internal("write pool closed".into()))?;
        let target = path.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            files::write_atomically(&target, &data)
        })
        .await
        .map_err(|e| NotebotError::Internal(format!("write task failed: {e}")))?
        .map_err(|source| NotebotError::Io { path, source })
    }
}
