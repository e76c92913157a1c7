// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event queue operations.

use std::str::FromStr;

use notebot_core::{ClaimRequest, Event, EventKind, NewEvent, NotebotError, StatusMessageRef};
use rusqlite::{params, Row, TransactionBehavior};

use crate::database::{conversion_err, map_tr_err, Database};
use crate::queries::downloads;

pub(crate) const EVENT_COLUMNS: &str = "id, owner_user_id, kind, payload, status_chat_id, \
     status_message_id, download_task_id, created_at, claimed_at, claim_token";

pub(crate) fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let kind: String = row.get(2)?;
    let payload: String = row.get(3)?;
    Ok(Event {
        id: row.get(0)?,
        owner_user_id: row.get(1)?,
        kind: EventKind::from_str(&kind).map_err(|e| conversion_err(2, e))?,
        payload: serde_json::from_str(&payload).map_err(|e| conversion_err(3, e))?,
        status_message: StatusMessageRef {
            chat_id: row.get(4)?,
            message_id: row.get(5)?,
        },
        download_task_id: row.get(6)?,
        created_at: row.get(7)?,
        claimed_at: row.get(8)?,
        claim_token: row.get(9)?,
    })
}

/// SQLite `strftime` modifier for "`stale_after` ago".
pub(crate) fn stale_modifier(request: &ClaimRequest) -> String {
    format!("-{:.3} seconds", request.stale_after.as_secs_f64())
}

/// SQLite treats a negative LIMIT as unbounded.
pub(crate) fn sql_limit(request: &ClaimRequest) -> i64 {
    request
        .limit
        .and_then(|l| i64::try_from(l).ok())
        .unwrap_or(-1)
}

pub(crate) fn insert_event(conn: &rusqlite::Connection, event: &NewEvent) -> rusqlite::Result<i64> {
    let payload = serde_json::to_string(&event.payload).map_err(|e| conversion_err(3, e))?;
    conn.execute(
        "INSERT INTO events (owner_user_id, kind, payload, status_chat_id, \
         status_message_id, download_task_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.owner_user_id,
            event.kind.to_string(),
            payload,
            event.status_message.chat_id,
            event.status_message.message_id,
            event.download_task_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Enqueue an event. Returns the new event id.
pub async fn enqueue_event(db: &Database, event: NewEvent) -> Result<i64, NotebotError> {
    db.connection()
        .call(move |conn| insert_event(conn, &event))
        .await
        .map_err(map_tr_err)
}

/// Enqueue a download task and the event that waits on it in one
/// transaction. Returns `(event_id, task_id)`.
pub async fn enqueue_event_with_download(
    db: &Database,
    mut event: NewEvent,
    remote_file_ref: &str,
    expected_size: Option<i64>,
) -> Result<(i64, i64), NotebotError> {
    let remote_file_ref = remote_file_ref.to_string();
    db.connection()
        .call(move |conn| -> Result<(i64, i64), rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let task_id = downloads::insert_task(&tx, &remote_file_ref, expected_size)?;
            event.download_task_id = Some(task_id);
            let event_id = insert_event(&tx, &event)?;
            tx.commit()?;
            Ok((event_id, task_id))
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically claim every eligible event.
///
/// A single `UPDATE ... RETURNING` inside an immediate transaction marks the
/// rows and returns exactly the rows it marked, so concurrent callers
/// (including other processes) receive disjoint batches. Users with a live
/// claim held by another token are skipped, so one user's events are only
/// ever in flight in one consumer. The result is ordered by arrival.
pub async fn claim_events(
    db: &Database,
    request: &ClaimRequest,
) -> Result<Vec<Event>, NotebotError> {
    let token = request.token.clone();
    let stale = stale_modifier(request);
    let limit = sql_limit(request);
    db.connection()
        .call(move |conn| -> Result<Vec<Event>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut claimed = {
                let mut stmt = tx.prepare(&format!(
                    "UPDATE events
                     SET claimed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), claim_token = ?1
                     WHERE id IN (
                         SELECT id FROM events
                         WHERE (claimed_at IS NULL
                                OR claimed_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2))
                           AND owner_user_id NOT IN (
                               SELECT owner_user_id FROM events
                               WHERE claim_token <> ?1
                                 AND claimed_at >= strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2)
                           )
                         ORDER BY created_at ASC, id ASC
                         LIMIT ?3
                     )
                     RETURNING {EVENT_COLUMNS}"
                ))?;
                let rows = stmt.query_map(params![token, stale, limit], event_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            tx.commit()?;
            claimed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)
}

/// Refresh the claim timestamp if `token` still holds the event.
pub async fn renew_claim(db: &Database, event_id: i64, token: &str) -> Result<bool, NotebotError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE events SET claimed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND claim_token = ?2",
                params![event_id, token],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Remove an event after it reached a terminal outcome.
pub async fn delete_event(db: &Database, event_id: i64) -> Result<(), NotebotError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM events WHERE id = ?1", params![event_id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_event(db: &Database, event_id: i64) -> Result<Option<Event>, NotebotError> {
    db.connection()
        .call(move |conn| -> Result<Option<Event>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"))?;
            match stmt.query_row(params![event_id], event_from_row) {
                Ok(event) => Ok(Some(event)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn new_event(user: i64, text: &str) -> NewEvent {
        NewEvent {
            owner_user_id: user,
            kind: EventKind::Text,
            payload: serde_json::json!({ "text": text }),
            status_message: StatusMessageRef {
                chat_id: user * 10,
                message_id: 1,
            },
            download_task_id: None,
        }
    }

    fn claim(token: &str) -> ClaimRequest {
        ClaimRequest {
            token: token.into(),
            limit: None,
            stale_after: Duration::from_secs(300),
        }
    }

    #[tokio::test]
    async fn event_and_download_are_enqueued_together() {
        let (db, _dir) = setup_db().await;
        let (event_id, task_id) =
            enqueue_event_with_download(&db, new_event(4, "photo"), "file-4", Some(12))
                .await
                .unwrap();

        let event = get_event(&db, event_id).await.unwrap().unwrap();
        assert_eq!(event.download_task_id, Some(task_id));
        let task = downloads::get_download_task(&db, task_id).await.unwrap().unwrap();
        assert_eq!(task.remote_file_ref, "file-4");
        assert_eq!(task.expected_size, Some(12));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_event_insert_leaves_no_download_behind() {
        let (db, _dir) = setup_db().await;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("DROP TABLE events")?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(
            enqueue_event_with_download(&db, new_event(5, "x"), "file-5", None)
                .await
                .is_err()
        );
        let tasks = downloads::claim_download_tasks(&db, &claim("dl")).await.unwrap();
        assert!(tasks.is_empty(), "{tasks:?}");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn enqueue_and_claim_lifecycle() {
        let (db, _dir) = setup_db().await;

        let id = enqueue_event(&db, new_event(1, "hello")).await.unwrap();
        assert!(id > 0);

        let claimed = claim_events(&db, &claim("dealer-a")).await.unwrap();
        assert_eq!(claimed.len(), 1);
        let event = &claimed[0];
        assert_eq!(event.id, id);
        assert!(event.is_claimed());
        assert_eq!(event.claim_token.as_deref(), Some("dealer-a"));
        assert_eq!(event.payload["text"], "hello");
        assert_eq!(event.status_message.chat_id, 10);

        // Nothing left to claim.
        assert!(claim_events(&db, &claim("dealer-b")).await.unwrap().is_empty());

        delete_event(&db, id).await.unwrap();
        assert!(get_event(&db, id).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claims_come_back_in_arrival_order() {
        let (db, _dir) = setup_db().await;
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(enqueue_event(&db, new_event(i % 2, &format!("m{i}"))).await.unwrap());
        }
        let claimed: Vec<i64> = claim_events(&db, &claim("d"))
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(claimed, ids);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn limit_bounds_the_batch() {
        let (db, _dir) = setup_db().await;
        for i in 0..4 {
            enqueue_event(&db, new_event(1, &format!("m{i}"))).await.unwrap();
        }
        let mut request = claim("d");
        request.limit = Some(3);
        assert_eq!(claim_events(&db, &request).await.unwrap().len(), 3);
        assert_eq!(claim_events(&db, &request).await.unwrap().len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stale_claims_are_reclaimable() {
        let (db, _dir) = setup_db().await;
        let id = enqueue_event(&db, new_event(1, "stuck")).await.unwrap();
        assert_eq!(claim_events(&db, &claim("crashed")).await.unwrap().len(), 1);

        // Simulate a consumer that died long ago.
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE events SET claimed_at = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let reclaimed = claim_events(&db, &claim("survivor")).await.unwrap();
        assert_eq!(reclaimed.len(), 1);
        assert_eq!(reclaimed[0].claim_token.as_deref(), Some("survivor"));

        // The crashed consumer has lost its claim.
        assert!(!renew_claim(&db, id, "crashed").await.unwrap());
        assert!(renew_claim(&db, id, "survivor").await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fresh_claims_are_not_stolen() {
        let (db, _dir) = setup_db().await;
        enqueue_event(&db, new_event(1, "busy")).await.unwrap();
        assert_eq!(claim_events(&db, &claim("a")).await.unwrap().len(), 1);
        assert!(claim_events(&db, &claim("b")).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn users_in_flight_elsewhere_are_skipped() {
        let (db, _dir) = setup_db().await;
        let mut request = claim("a");
        request.limit = Some(1);
        let first = enqueue_event(&db, new_event(1, "first")).await.unwrap();
        assert_eq!(claim_events(&db, &request).await.unwrap()[0].id, first);

        let second = enqueue_event(&db, new_event(1, "second")).await.unwrap();
        let other_user = enqueue_event(&db, new_event(2, "other")).await.unwrap();

        // Consumer b may take user 2, never user 1 while a holds it.
        let taken: Vec<i64> = claim_events(&db, &claim("b"))
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(taken, vec![other_user]);

        // The holder keeps draining its own user.
        assert_eq!(claim_events(&db, &claim("a")).await.unwrap()[0].id, second);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stale_holders_do_not_block_their_user() {
        let (db, _dir) = setup_db().await;
        let stuck = enqueue_event(&db, new_event(1, "stuck")).await.unwrap();
        assert_eq!(claim_events(&db, &claim("crashed")).await.unwrap().len(), 1);
        db.connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "UPDATE events SET claimed_at = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
                    params![stuck],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        let next = enqueue_event(&db, new_event(1, "next")).await.unwrap();

        let taken: Vec<i64> = claim_events(&db, &claim("survivor"))
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(taken, vec![stuck, next]);
        db.close().await.unwrap();
    }
}
