// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dead-letter operations.

use std::str::FromStr;

use notebot_core::{ChatMessage, Event, EventKind, FailureRecord, NotebotError, StatusMessageRef};
use rusqlite::{params, Row, TransactionBehavior};

use crate::database::{conversion_err, map_tr_err, Database};
use crate::queries::{downloads, events};

const FAILURE_COLUMNS: &str = "id, event_id, owner_user_id, kind, payload, status_chat_id, \
     status_message_id, download_task_id, event_created_at, error_detail, failed_at";

fn failure_from_row(row: &Row<'_>) -> rusqlite::Result<FailureRecord> {
    let kind: String = row.get(3)?;
    let payload: String = row.get(4)?;
    Ok(FailureRecord {
        id: row.get(0)?,
        event_id: row.get(1)?,
        owner_user_id: row.get(2)?,
        kind: EventKind::from_str(&kind).map_err(|e| conversion_err(3, e))?,
        payload: serde_json::from_str(&payload).map_err(|e| conversion_err(4, e))?,
        status_message: StatusMessageRef {
            chat_id: row.get(5)?,
            message_id: row.get(6)?,
        },
        download_task_id: row.get(7)?,
        event_created_at: row.get(8)?,
        error_detail: row.get(9)?,
        failed_at: row.get(10)?,
    })
}

fn query_failure(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Option<FailureRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FAILURE_COLUMNS} FROM failed_events WHERE id = ?1"
    ))?;
    match stmt.query_row(params![id], failure_from_row) {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Record a failure and remove the event in one transaction.
pub async fn dead_letter(
    db: &Database,
    event: &Event,
    error_detail: &str,
) -> Result<i64, NotebotError> {
    let event = event.clone();
    let error_detail = error_detail.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            let payload =
                serde_json::to_string(&event.payload).map_err(|e| conversion_err(4, e))?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO failed_events (event_id, owner_user_id, kind, payload, \
                 status_chat_id, status_message_id, download_task_id, event_created_at, \
                 error_detail) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    event.id,
                    event.owner_user_id,
                    event.kind.to_string(),
                    payload,
                    event.status_message.chat_id,
                    event.status_message.message_id,
                    event.download_task_id,
                    event.created_at,
                    error_detail,
                ],
            )?;
            let record_id = tx.last_insert_rowid();
            tx.execute("DELETE FROM events WHERE id = ?1", params![event.id])?;
            tx.commit()?;
            Ok(record_id)
        })
        .await
        .map_err(map_tr_err)
}

/// List failure records, oldest first.
pub async fn list_failures(
    db: &Database,
    limit: Option<usize>,
) -> Result<Vec<FailureRecord>, NotebotError> {
    let limit = limit.and_then(|l| i64::try_from(l).ok()).unwrap_or(-1);
    db.connection()
        .call(move |conn| -> Result<Vec<FailureRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FAILURE_COLUMNS} FROM failed_events ORDER BY id ASC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], failure_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_failure(db: &Database, id: i64) -> Result<Option<FailureRecord>, NotebotError> {
    db.connection()
        .call(move |conn| query_failure(conn, id))
        .await
        .map_err(map_tr_err)
}

/// Re-enqueue a failure's payload as a new event and delete the record.
///
/// File-bearing events get a fresh download task, since the original file
/// was cleaned up when the event failed.
pub async fn replay_failure(db: &Database, id: i64) -> Result<Option<i64>, NotebotError> {
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(record) = query_failure(&tx, id)? else {
                return Ok(None);
            };

            let mut event = record.to_new_event();
            if record.kind.has_file() {
                let message: ChatMessage = serde_json::from_value(record.payload.clone())
                    .map_err(|e| conversion_err(4, e))?;
                if let Some(file) = message.primary_file(record.kind) {
                    let task_id = downloads::insert_task(&tx, file.file_id, file.file_size)?;
                    event.download_task_id = Some(task_id);
                }
            }

            let event_id = events::insert_event(&tx, &event)?;
            tx.execute("DELETE FROM failed_events WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(Some(event_id))
        })
        .await
        .map_err(map_tr_err)
}
