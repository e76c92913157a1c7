// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `notebot failures list` and `notebot failures replay`.

use notebot_config::model::NotebotConfig;
use notebot_core::{FailureRecord, FailureSink, NotebotError, StorageAdapter};
use notebot_storage::SqliteStorage;
use serde::Serialize;

/// One dead-lettered event, as printed by `--json`.
#[derive(Debug, Serialize)]
pub struct FailureSummary {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub kind: String,
    pub failed_at: String,
    pub error: String,
}

impl From<&FailureRecord> for FailureSummary {
    fn from(record: &FailureRecord) -> Self {
        Self {
            id: record.id,
            event_id: record.event_id,
            user_id: record.owner_user_id,
            kind: record.kind.to_string(),
            failed_at: record.failed_at.clone(),
            error: record.error_detail.clone(),
        }
    }
}

async fn open(config: &NotebotConfig) -> Result<SqliteStorage, NotebotError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(storage)
}

/// Formats one failure as a single terminal line.
fn format_line(s: &FailureSummary) -> String {
    let error = s.error.lines().next().unwrap_or_default();
    format!(
        "{:>6}  event {:<6} user {:<12} {:<9} {}  {}",
        s.id, s.event_id, s.user_id, s.kind, s.failed_at, error
    )
}

pub async fn run_list(
    config: &NotebotConfig,
    limit: Option<usize>,
    json: bool,
) -> Result<(), NotebotError> {
    let storage = open(config).await?;
    let records = storage.list_failures(limit).await?;
    let summaries: Vec<FailureSummary> = records.iter().map(FailureSummary::from).collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summaries).unwrap_or_else(|_| "[]".to_string())
        );
    } else if summaries.is_empty() {
        println!("no failed events");
    } else {
        for summary in &summaries {
            println!("{}", format_line(summary));
        }
    }
    storage.close().await
}

/// What `failures replay` should re-enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayTarget {
    One(i64),
    All,
}

/// Re-enqueues failures and returns `(failure id, new event id)` pairs.
pub async fn replay(
    storage: &SqliteStorage,
    target: ReplayTarget,
) -> Result<Vec<(i64, i64)>, NotebotError> {
    let ids: Vec<i64> = match target {
        ReplayTarget::One(id) => vec![id],
        ReplayTarget::All => storage
            .list_failures(None)
            .await?
            .iter()
            .map(|r| r.id)
            .collect(),
    };

    let mut replayed = Vec::with_capacity(ids.len());
    for id in ids {
        match storage.replay_failure(id).await? {
            Some(event_id) => replayed.push((id, event_id)),
            None if target == ReplayTarget::One(id) => {
                return Err(NotebotError::Internal(format!("failure {id} does not exist")));
            }
            // Replayed concurrently by another process.
            None => {}
        }
    }
    Ok(replayed)
}

pub async fn run_replay(config: &NotebotConfig, target: ReplayTarget) -> Result<(), NotebotError> {
    let storage = open(config).await?;
    let replayed = replay(&storage, target).await?;
    if replayed.is_empty() {
        println!("nothing to replay");
    }
    for (failure_id, event_id) in &replayed {
        println!("failure {failure_id} re-enqueued as event {event_id}");
    }
    storage.close().await
}
