// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion boundary: turns an inbound chat message into queued work.

use std::sync::Arc;

use notebot_core::{ChatClient, ChatMessage, EventKind, NewEvent, NotebotError, WorkStore};
use tracing::{debug, info, warn};

use crate::status;

/// Maps a raw chat payload to the handler kind that stores it.
///
/// Returns `None` for payloads that are not a chat message or carry nothing
/// the pipeline stores.
pub fn classify(payload: &serde_json::Value) -> Option<EventKind> {
    serde_json::from_value::<ChatMessage>(payload.clone())
        .ok()?
        .classify()
}

/// Acknowledges inbound messages and enqueues them for the dealer.
#[derive(Clone)]
pub struct Intake {
    store: Arc<dyn WorkStore>,
    chat: Arc<dyn ChatClient>,
}

impl Intake {
    pub fn new(store: Arc<dyn WorkStore>, chat: Arc<dyn ChatClient>) -> Self {
        Self { store, chat }
    }

    /// Sends the "accepted" status, queues the download for file-bearing
    /// kinds, and queues the event linked to both. Returns the event id.
    pub async fn accept(
        &self,
        user_id: i64,
        chat_id: i64,
        kind: EventKind,
        payload: serde_json::Value,
    ) -> Result<i64, NotebotError> {
        let message: ChatMessage = serde_json::from_value(payload.clone())
            .map_err(|e| NotebotError::Payload(format!("{kind} message from user {user_id}: {e}")))?;

        // Validate before acknowledging so a bad payload gets no status message.
        let remote = if kind.has_file() {
            let file = message.primary_file(kind).ok_or_else(|| {
                NotebotError::Payload(format!("{kind} message from user {user_id} has no file"))
            })?;
            Some((file.file_id.to_string(), file.file_size))
        } else {
            None
        };

        let status_message = self.chat.send_message(chat_id, status::ACCEPTED).await?;

        let event = NewEvent {
            owner_user_id: user_id,
            kind,
            payload,
            status_message,
            download_task_id: None,
        };
        let queued = match remote {
            Some((file_ref, size)) => self
                .store
                .enqueue_event_with_download(event, &file_ref, size)
                .await
                .map(|(event_id, task_id)| {
                    debug!(user_id, task_id, "download queued");
                    event_id
                }),
            None => self.store.enqueue_event(event).await,
        };
        let event_id = match queued {
            Ok(id) => id,
            Err(e) => {
                // Nothing will ever update the acknowledgement otherwise.
                if let Err(edit_err) = self
                    .chat
                    .edit_message_text(&status_message, status::FAILED)
                    .await
                {
                    warn!(user_id, error = %edit_err, "failed to report enqueue failure");
                }
                return Err(e);
            }
        };
        info!(event_id, user_id, kind = %kind, "event accepted");
        Ok(event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_prefers_files_over_text() {
        assert_eq!(classify(&json!({ "text": "hi" })), Some(EventKind::Text));
        assert_eq!(
            classify(&json!({
                "caption": "look",
                "photo": [{ "file_id": "p1", "file_size": 10 }]
            })),
            Some(EventKind::Photo)
        );
        assert_eq!(
            classify(&json!({ "location": { "latitude": 1.0, "longitude": 2.0 } })),
            Some(EventKind::Location)
        );
    }

    #[test]
    fn classify_rejects_unsupported_payloads() {
        assert_eq!(classify(&json!({ "sticker": { "file_id": "s" } })), None);
        assert_eq!(classify(&json!("not a message")), None);
    }
}
