// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User lookups and the two repairs the pipeline is allowed to make.

use std::collections::HashMap;

use notebot_core::{Notebook, NotebotError, User, UserMode};
use rusqlite::{params, Row, TransactionBehavior};

use crate::database::{conversion_err, map_tr_err, Database};

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let mode: Option<String> = row.get(3)?;
    let places: String = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        note_store_access_token: row.get(2)?,
        mode: mode.as_deref().and_then(UserMode::parse_lenient),
        current_notebook: Notebook {
            guid: row.get(4)?,
            name: row.get(5)?,
        },
        // A corrupt places column reads as empty; the handler re-pins.
        places: serde_json::from_str(&places).unwrap_or_default(),
        state: row.get(7)?,
    })
}

pub async fn get_user(db: &Database, user_id: i64) -> Result<Option<User>, NotebotError> {
    db.connection()
        .call(move |conn| -> Result<Option<User>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, note_store_access_token, mode, notebook_guid, \
                 notebook_name, places, state FROM users WHERE id = ?1",
            )?;
            match stmt.query_row(params![user_id], user_from_row) {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn upsert_user(db: &Database, user: &User) -> Result<(), NotebotError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let places = serde_json::to_string(&user.places).map_err(|e| conversion_err(6, e))?;
            conn.execute(
                "INSERT INTO users (id, chat_id, note_store_access_token, mode, notebook_guid, \
                 notebook_name, places, state) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     chat_id = excluded.chat_id,
                     note_store_access_token = excluded.note_store_access_token,
                     mode = excluded.mode,
                     notebook_guid = excluded.notebook_guid,
                     notebook_name = excluded.notebook_name,
                     places = excluded.places,
                     state = excluded.state,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    user.id,
                    user.chat_id,
                    user.note_store_access_token,
                    user.mode.map(|m| m.to_string()),
                    user.current_notebook.guid,
                    user.current_notebook.name,
                    places,
                    user.state,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Retarget the pinned note for one notebook, leaving other pins intact.
pub async fn set_place(
    db: &Database,
    user_id: i64,
    notebook_guid: &str,
    note_guid: &str,
) -> Result<(), NotebotError> {
    let notebook_guid = notebook_guid.to_string();
    let note_guid = note_guid.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let raw: String = tx.query_row(
                "SELECT places FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            let mut places: HashMap<String, String> =
                serde_json::from_str(&raw).unwrap_or_default();
            places.insert(notebook_guid, note_guid);
            let raw = serde_json::to_string(&places).map_err(|e| conversion_err(0, e))?;
            tx.execute(
                "UPDATE users SET places = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![raw, user_id],
            )?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_mode(db: &Database, user_id: i64, mode: UserMode) -> Result<(), NotebotError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE users SET mode = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![mode.to_string(), user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn user(id: i64) -> User {
        User {
            id,
            chat_id: id * 100,
            note_store_access_token: "token".into(),
            mode: Some(UserMode::OneNote),
            current_notebook: Notebook {
                guid: "nb-1".into(),
                name: "Inbox".into(),
            },
            places: HashMap::from([("nb-0".to_string(), "old".to_string())]),
            state: None,
        }
    }

    #[tokio::test]
    async fn upsert_and_get_round_trip() {
        let (db, _dir) = setup_db().await;
        assert!(get_user(&db, 5).await.unwrap().is_none());
        upsert_user(&db, &user(5)).await.unwrap();
        assert_eq!(get_user(&db, 5).await.unwrap().unwrap(), user(5));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_place_keeps_other_notebooks() {
        let (db, _dir) = setup_db().await;
        upsert_user(&db, &user(5)).await.unwrap();
        set_place(&db, 5, "nb-1", "pinned").await.unwrap();
        let stored = get_user(&db, 5).await.unwrap().unwrap();
        assert_eq!(stored.pinned_note(), Some("pinned"));
        assert_eq!(stored.places.get("nb-0").map(String::as_str), Some("old"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn garbage_mode_reads_as_unset_and_can_be_repaired() {
        let (db, _dir) = setup_db().await;
        upsert_user(&db, &user(5)).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("UPDATE users SET mode = 'sometimes' WHERE id = 5", [])?;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(get_user(&db, 5).await.unwrap().unwrap().mode, None);

        set_mode(&db, 5, UserMode::MultipleNotes).await.unwrap();
        assert_eq!(
            get_user(&db, 5).await.unwrap().unwrap().mode,
            Some(UserMode::MultipleNotes)
        );
        db.close().await.unwrap();
    }
}
