// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `notebot status` command implementation.
//!
//! Reads queue counts straight from the work store, so it works whether or
//! not any consumer is running.

use notebot_config::model::NotebotConfig;
use notebot_core::{NotebotError, QueueStats, StorageAdapter};
use notebot_storage::SqliteStorage;
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database: String,
    pub pending_events: u64,
    pub claimed_events: u64,
    pub pending_downloads: u64,
    pub completed_downloads: u64,
    pub failed_downloads: u64,
    pub failures: u64,
}

impl StatusResponse {
    fn new(database: &str, stats: QueueStats) -> Self {
        Self {
            database: database.to_string(),
            pending_events: stats.pending_events,
            claimed_events: stats.claimed_events,
            pending_downloads: stats.pending_downloads,
            completed_downloads: stats.completed_downloads,
            failed_downloads: stats.failed_downloads,
            failures: stats.failures,
        }
    }

    fn render(&self) -> String {
        format!(
            "database: {}\n\
             events:    {} pending, {} claimed\n\
             downloads: {} pending, {} completed, {} failed\n\
             failures:  {}",
            self.database,
            self.pending_events,
            self.claimed_events,
            self.pending_downloads,
            self.completed_downloads,
            self.failed_downloads,
            self.failures,
        )
    }
}

pub async fn run_status(config: &NotebotConfig, json: bool) -> Result<(), NotebotError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let response = StatusResponse::new(&config.storage.database_path, storage.queue_stats().await?);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        println!("{}", response.render());
    }
    storage.close().await
}
