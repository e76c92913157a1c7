// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the work store, failure sink, and user directory.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use notebot_config::model::StorageConfig;
use notebot_core::{
    AdapterType, ClaimRequest, DownloadTask, Event, FailureRecord, FailureSink, HealthStatus,
    NewEvent, NotebotError, PluginAdapter, QueueStats, StorageAdapter, User, UserDirectory,
    UserMode, WorkStore,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates every operation to the query
/// modules. The database is opened on the first call to
/// [`StorageAdapter::initialize`]. Several instances, in one process or
/// many, may point at the same file.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, NotebotError> {
        self.db.get().ok_or_else(|| NotebotError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Counts documents in each queue state.
    pub async fn queue_stats(&self) -> Result<QueueStats, NotebotError> {
        queries::stats::queue_stats(self.db()?).await
    }

    pub async fn get_event(&self, event_id: i64) -> Result<Option<Event>, NotebotError> {
        queries::events::get_event(self.db()?, event_id).await
    }

    /// Looks up a user without failing when they are absent.
    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, NotebotError> {
        queries::users::get_user(self.db()?, user_id).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, NotebotError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NotebotError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), NotebotError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| NotebotError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), NotebotError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl WorkStore for SqliteStorage {
    async fn enqueue_event(&self, event: NewEvent) -> Result<i64, NotebotError> {
        queries::events::enqueue_event(self.db()?, event).await
    }

    async fn enqueue_download(
        &self,
        remote_file_ref: &str,
        expected_size: Option<i64>,
    ) -> Result<i64, NotebotError> {
        queries::downloads::enqueue_download(self.db()?, remote_file_ref, expected_size).await
    }

    async fn enqueue_event_with_download(
        &self,
        event: NewEvent,
        remote_file_ref: &str,
        expected_size: Option<i64>,
    ) -> Result<(i64, i64), NotebotError> {
        queries::events::enqueue_event_with_download(
            self.db()?,
            event,
            remote_file_ref,
            expected_size,
        )
        .await
    }

    async fn claim_events(&self, request: &ClaimRequest) -> Result<Vec<Event>, NotebotError> {
        queries::events::claim_events(self.db()?, request).await
    }

    async fn renew_event_claim(&self, event_id: i64, token: &str) -> Result<bool, NotebotError> {
        queries::events::renew_claim(self.db()?, event_id, token).await
    }

    async fn delete_event(&self, event_id: i64) -> Result<(), NotebotError> {
        queries::events::delete_event(self.db()?, event_id).await
    }

    async fn claim_download_tasks(
        &self,
        request: &ClaimRequest,
    ) -> Result<Vec<DownloadTask>, NotebotError> {
        queries::downloads::claim_download_tasks(self.db()?, request).await
    }

    async fn complete_download_task(
        &self,
        task_id: i64,
        local_path: &str,
        mime_type: &str,
    ) -> Result<bool, NotebotError> {
        queries::downloads::complete_download_task(self.db()?, task_id, local_path, mime_type)
            .await
    }

    async fn fail_download_task(&self, task_id: i64, error: &str) -> Result<(), NotebotError> {
        queries::downloads::fail_download_task(self.db()?, task_id, error).await
    }

    async fn get_download_task(&self, task_id: i64) -> Result<Option<DownloadTask>, NotebotError> {
        queries::downloads::get_download_task(self.db()?, task_id).await
    }

    async fn delete_download_task(&self, task_id: i64) -> Result<(), NotebotError> {
        queries::downloads::delete_download_task(self.db()?, task_id).await
    }
}

#[async_trait]
impl FailureSink for SqliteStorage {
    async fn dead_letter(&self, event: &Event, error_detail: &str) -> Result<i64, NotebotError> {
        queries::failures::dead_letter(self.db()?, event, error_detail).await
    }

    async fn list_failures(&self, limit: Option<usize>) -> Result<Vec<FailureRecord>, NotebotError> {
        queries::failures::list_failures(self.db()?, limit).await
    }

    async fn get_failure(&self, id: i64) -> Result<Option<FailureRecord>, NotebotError> {
        queries::failures::get_failure(self.db()?, id).await
    }

    async fn replay_failure(&self, id: i64) -> Result<Option<i64>, NotebotError> {
        queries::failures::replay_failure(self.db()?, id).await
    }
}

#[async_trait]
impl UserDirectory for SqliteStorage {
    async fn resolve_user(&self, user_id: i64) -> Result<User, NotebotError> {
        queries::users::get_user(self.db()?, user_id)
            .await?
            .ok_or(NotebotError::UserNotFound { user_id })
    }

    async fn upsert_user(&self, user: &User) -> Result<(), NotebotError> {
        queries::users::upsert_user(self.db()?, user).await
    }

    async fn set_place(
        &self,
        user_id: i64,
        notebook_guid: &str,
        note_guid: &str,
    ) -> Result<(), NotebotError> {
        queries::users::set_place(self.db()?, user_id, notebook_guid, note_guid).await
    }

    async fn set_mode(&self, user_id: i64, mode: UserMode) -> Result<(), NotebotError> {
        queries::users::set_mode(self.db()?, user_id, mode).await
    }
}
