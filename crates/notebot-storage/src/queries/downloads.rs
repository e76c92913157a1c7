// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Download task operations.

use notebot_core::{ClaimRequest, DownloadTask, NotebotError};
use rusqlite::{params, Row, TransactionBehavior};

use crate::database::{map_tr_err, Database};
use crate::queries::events::{sql_limit, stale_modifier};

const TASK_COLUMNS: &str = "id, remote_file_ref, expected_size, completed, claimed_at, \
     local_path, mime_type, last_error, created_at";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<DownloadTask> {
    Ok(DownloadTask {
        id: row.get(0)?,
        remote_file_ref: row.get(1)?,
        expected_size: row.get(2)?,
        completed: row.get(3)?,
        claimed_at: row.get(4)?,
        local_path: row.get(5)?,
        mime_type: row.get(6)?,
        last_error: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub(crate) fn insert_task(
    conn: &rusqlite::Connection,
    remote_file_ref: &str,
    expected_size: Option<i64>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO download_tasks (remote_file_ref, expected_size) VALUES (?1, ?2)",
        params![remote_file_ref, expected_size],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Enqueue a download task. Returns the new task id.
pub async fn enqueue_download(
    db: &Database,
    remote_file_ref: &str,
    expected_size: Option<i64>,
) -> Result<i64, NotebotError> {
    let remote_file_ref = remote_file_ref.to_string();
    db.connection()
        .call(move |conn| insert_task(conn, &remote_file_ref, expected_size))
        .await
        .map_err(map_tr_err)
}

/// Atomically claim incomplete tasks that are unclaimed or stale.
///
/// Tasks whose fetch failed keep their claim and are skipped.
pub async fn claim_download_tasks(
    db: &Database,
    request: &ClaimRequest,
) -> Result<Vec<DownloadTask>, NotebotError> {
    let token = request.token.clone();
    let stale = stale_modifier(request);
    let limit = sql_limit(request);
    db.connection()
        .call(move |conn| -> Result<Vec<DownloadTask>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut claimed = {
                let mut stmt = tx.prepare(&format!(
                    "UPDATE download_tasks
                     SET claimed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), claim_token = ?1
                     WHERE id IN (
                         SELECT id FROM download_tasks
                         WHERE completed = 0 AND last_error IS NULL
                           AND (claimed_at IS NULL
                                OR claimed_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2))
                         ORDER BY created_at ASC, id ASC
                         LIMIT ?3
                     )
                     RETURNING {TASK_COLUMNS}"
                ))?;
                let rows = stmt.query_map(params![token, stale, limit], task_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            tx.commit()?;
            claimed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a task completed with its local file and mime type.
///
/// Returns whether the task still existed.
pub async fn complete_download_task(
    db: &Database,
    task_id: i64,
    local_path: &str,
    mime_type: &str,
) -> Result<bool, NotebotError> {
    let local_path = local_path.to_string();
    let mime_type = mime_type.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE download_tasks
                 SET completed = 1, local_path = ?1, mime_type = ?2, last_error = NULL,
                     completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![local_path, mime_type, task_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed fetch, leaving the task claimed and incomplete.
pub async fn fail_download_task(
    db: &Database,
    task_id: i64,
    error: &str,
) -> Result<(), NotebotError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE download_tasks SET last_error = ?1 WHERE id = ?2 AND completed = 0",
                params![error, task_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_download_task(
    db: &Database,
    task_id: i64,
) -> Result<Option<DownloadTask>, NotebotError> {
    db.connection()
        .call(move |conn| -> Result<Option<DownloadTask>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM download_tasks WHERE id = ?1"
            ))?;
            match stmt.query_row(params![task_id], task_from_row) {
                Ok(task) => Ok(Some(task)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_download_task(db: &Database, task_id: i64) -> Result<(), NotebotError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM download_tasks WHERE id = ?1", params![task_id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
