// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline tests.
//!
//! `TestHarness` assembles the work store on a temp SQLite database, the
//! mock chat and note-store clients, and a config with fast poll intervals.
//! The builders hand out dealers, fetch workers, and intakes wired to the
//! same collaborators.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notebot_config::model::{DealerConfig, DownloaderConfig, NotebotConfig, NotesConfig, StorageConfig};
use notebot_core::{
    ChatClient, FailureSink, NoteStore, NotebotError, Notebook, StorageAdapter, User,
    UserDirectory, UserMode, WorkStore,
};
use notebot_dealer::{Dealer, Intake};
use notebot_downloader::FetchWorker;
use notebot_handlers::HandlerContext;
use notebot_storage::SqliteStorage;

use crate::mock_chat::MockChat;
use crate::mock_note_store::MockNoteStore;

/// Poll interval used by every consumer the harness builds.
const FAST_POLL_MS: u64 = 10;

pub struct TestHarnessBuilder {
    file_base_url: Option<String>,
    asset_wait_secs: u64,
    claim_timeout_secs: u64,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            file_base_url: None,
            asset_wait_secs: 2,
            claim_timeout_secs: 300,
        }
    }

    /// Base URL file references resolve against, e.g. a wiremock server.
    pub fn with_file_base_url(mut self, url: impl Into<String>) -> Self {
        self.file_base_url = Some(url.into());
        self
    }

    pub fn with_asset_wait_secs(mut self, secs: u64) -> Self {
        self.asset_wait_secs = secs;
        self
    }

    pub fn with_claim_timeout_secs(mut self, secs: u64) -> Self {
        self.claim_timeout_secs = secs;
        self
    }

    pub async fn build(self) -> Result<TestHarness, NotebotError> {
        let temp_dir = tempfile::TempDir::new().map_err(NotebotError::storage)?;
        let root = temp_dir.path();

        let config = NotebotConfig {
            storage: StorageConfig {
                database_path: root.join("test.db").to_string_lossy().into_owned(),
                wal_mode: true,
            },
            dealer: DealerConfig {
                poll_interval_ms: FAST_POLL_MS,
                claim_timeout_secs: self.claim_timeout_secs,
                asset_wait_secs: self.asset_wait_secs,
                shutdown_grace_secs: 5,
            },
            downloader: DownloaderConfig {
                download_dir: root.join("downloads").to_string_lossy().into_owned(),
                poll_interval_ms: FAST_POLL_MS,
                write_workers: 2,
                max_concurrent_fetches: 4,
                claim_timeout_secs: self.claim_timeout_secs,
            },
            notes: NotesConfig {
                notes_dir: root.join("notes").to_string_lossy().into_owned(),
                // Never on PATH, so voice falls back to the original file.
                transcode_command: "notebot-test-no-transcoder".to_string(),
                ..NotesConfig::default()
            },
            ..NotebotConfig::default()
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;

        let chat = match self.file_base_url {
            Some(url) => MockChat::with_file_base_url(url),
            None => MockChat::new(),
        };
        let notes = MockNoteStore::with_title_prefix(config.notes.title_prefix.clone());

        Ok(TestHarness {
            storage: Arc::new(storage),
            chat: Arc::new(chat),
            notes: Arc::new(notes),
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete pipeline environment with mock adapters and temp storage.
pub struct TestHarness {
    /// SQLite work store (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub chat: Arc<MockChat>,
    pub notes: Arc<MockNoteStore>,
    pub config: NotebotConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub async fn new() -> Result<Self, NotebotError> {
        Self::builder().build().await
    }

    pub fn store(&self) -> Arc<dyn WorkStore> {
        self.storage.clone()
    }

    pub fn users(&self) -> Arc<dyn UserDirectory> {
        self.storage.clone()
    }

    pub fn failures(&self) -> Arc<dyn FailureSink> {
        self.storage.clone()
    }

    pub fn chat_client(&self) -> Arc<dyn ChatClient> {
        self.chat.clone()
    }

    pub fn download_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.downloader.download_dir)
    }

    /// Links a user with token `token-{id}` writing into notebook `nb-{id}`.
    pub async fn add_user(&self, id: i64, mode: Option<UserMode>) -> Result<User, NotebotError> {
        let user = User {
            id,
            chat_id: id,
            note_store_access_token: format!("token-{id}"),
            mode,
            current_notebook: Notebook {
                guid: format!("nb-{id}"),
                name: "Inbox".to_string(),
            },
            places: HashMap::new(),
            state: None,
        };
        self.storage.upsert_user(&user).await?;
        Ok(user)
    }

    pub fn handler_context(&self) -> HandlerContext {
        let notes: Arc<dyn NoteStore> = self.notes.clone();
        HandlerContext::new(
            self.store(),
            self.users(),
            notes,
            self.config.notes.clone(),
            self.config.dealer.asset_wait(),
        )
        .with_asset_poll(Duration::from_millis(FAST_POLL_MS))
    }

    pub fn dealer(&self) -> Dealer {
        Dealer::new(
            self.handler_context(),
            self.failures(),
            self.chat_client(),
            &self.config.dealer,
        )
    }

    pub fn intake(&self) -> Intake {
        Intake::new(self.store(), self.chat_client())
    }

    pub fn fetch_worker(&self) -> Result<FetchWorker, NotebotError> {
        FetchWorker::new(self.store(), self.chat_client(), &self.config.downloader)
    }

    /// Polls until no events remain in the live queue or `timeout` elapses.
    ///
    /// Returns whether the queue drained.
    pub async fn wait_for_empty_queue(&self, timeout: Duration) -> Result<bool, NotebotError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let stats = self.storage.queue_stats().await?;
            if stats.pending_events == 0 && stats.claimed_events == 0 {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(FAST_POLL_MS)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_links_users() {
        let harness = TestHarness::new().await.unwrap();
        harness.add_user(7, Some(UserMode::OneNote)).await.unwrap();
        let user = harness.users().resolve_user(7).await.unwrap();
        assert_eq!(user.note_store_access_token, "token-7");
        assert_eq!(user.mode, Some(UserMode::OneNote));
    }

    #[tokio::test]
    async fn fresh_harness_has_an_empty_queue() {
        let harness = TestHarness::new().await.unwrap();
        assert!(
            harness
                .wait_for_empty_queue(Duration::from_millis(50))
                .await
                .unwrap()
        );
    }
}
