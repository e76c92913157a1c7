// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue depth counters for `notebot status`.

use notebot_core::{NotebotError, QueueStats};

use crate::database::{map_tr_err, Database};

pub async fn queue_stats(db: &Database) -> Result<QueueStats, NotebotError> {
    db.connection()
        .call(|conn| -> Result<QueueStats, rusqlite::Error> {
            conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM events WHERE claimed_at IS NULL),
                    (SELECT COUNT(*) FROM events WHERE claimed_at IS NOT NULL),
                    (SELECT COUNT(*) FROM download_tasks WHERE completed = 0 AND last_error IS NULL),
                    (SELECT COUNT(*) FROM download_tasks WHERE completed = 1),
                    (SELECT COUNT(*) FROM download_tasks WHERE last_error IS NOT NULL),
                    (SELECT COUNT(*) FROM failed_events)",
                [],
                |row| {
                    Ok(QueueStats {
                        pending_events: row.get(0)?,
                        claimed_events: row.get(1)?,
                        pending_downloads: row.get(2)?,
                        completed_downloads: row.get(3)?,
                        failed_downloads: row.get(4)?,
                        failures: row.get(5)?,
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}
