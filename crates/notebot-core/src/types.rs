// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the work store, the consumers, and the adapters.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::NotebotError;
use crate::payload::ChatMessage;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays in the pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Chat,
    NoteStore,
    Observability,
}

/// The closed set of inbound message kinds the pipeline turns into notes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Text,
    Photo,
    Video,
    Document,
    Voice,
    Location,
}

impl EventKind {
    /// Capitalized name used in note titles and status messages.
    pub fn title(&self) -> &'static str {
        match self {
            EventKind::Text => "Text",
            EventKind::Photo => "Photo",
            EventKind::Video => "Video",
            EventKind::Document => "Document",
            EventKind::Voice => "Voice",
            EventKind::Location => "Location",
        }
    }

    /// Whether events of this kind carry a binary attachment.
    pub fn has_file(&self) -> bool {
        matches!(
            self,
            EventKind::Photo | EventKind::Video | EventKind::Document | EventKind::Voice
        )
    }
}

/// Reference to the chat message that shows an event's progress to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusMessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// An event as handed to the work store by the ingestion boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub owner_user_id: i64,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub status_message: StatusMessageRef,
    pub download_task_id: Option<i64>,
}

/// One inbound chat message awaiting a note-store write.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: i64,
    pub owner_user_id: i64,
    pub kind: EventKind,
    /// Raw chat message, kept opaque until a handler parses it.
    pub payload: serde_json::Value,
    pub status_message: StatusMessageRef,
    pub download_task_id: Option<i64>,
    pub created_at: String,
    /// Set while a consumer holds the claim.
    pub claimed_at: Option<String>,
    pub claim_token: Option<String>,
}

impl Event {
    pub fn is_claimed(&self) -> bool {
        self.claimed_at.is_some()
    }

    /// Parses the raw payload into the chat message model.
    pub fn message(&self) -> Result<ChatMessage, NotebotError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| NotebotError::Payload(format!("event {}: {e}", self.id)))
    }
}

/// One binary attachment to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub id: i64,
    pub remote_file_ref: String,
    pub expected_size: Option<i64>,
    pub completed: bool,
    pub claimed_at: Option<String>,
    pub local_path: Option<String>,
    pub mime_type: Option<String>,
    /// Set when the fetch failed; such tasks are never reclaimed.
    pub last_error: Option<String>,
    pub created_at: String,
}

/// Parameters of an atomic batch claim.
///
/// A document is eligible when it has never been claimed, or when its claim
/// is older than `stale_after`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    /// Identifies the consumer; stamped on every claimed document.
    pub token: String,
    /// Maximum batch size. `None` claims everything eligible.
    pub limit: Option<usize>,
    pub stale_after: Duration,
}

/// How a user's events are written to the note store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserMode {
    /// Append every event to one pinned note per notebook.
    OneNote,
    /// Create a new note per event.
    MultipleNotes,
}

impl UserMode {
    /// Parses a stored mode, returning `None` for anything unrecognized.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

/// Notebook the user currently writes into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    pub guid: String,
    pub name: String,
}

/// An end user's note-store linkage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub chat_id: i64,
    pub note_store_access_token: String,
    /// `None` when unset or unreadable.
    pub mode: Option<UserMode>,
    pub current_notebook: Notebook,
    /// Notebook guid -> pinned note guid (one-note mode only).
    pub places: HashMap<String, String>,
    pub state: Option<String>,
}

impl User {
    /// The pinned note for the current notebook, if any.
    pub fn pinned_note(&self) -> Option<&str> {
        self.places
            .get(&self.current_notebook.guid)
            .map(String::as_str)
            .filter(|guid| !guid.is_empty())
    }
}

/// A permanently failed event preserved for manual replay.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub id: i64,
    pub event_id: i64,
    pub owner_user_id: i64,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub status_message: StatusMessageRef,
    pub download_task_id: Option<i64>,
    pub event_created_at: String,
    pub error_detail: String,
    pub failed_at: String,
}

impl FailureRecord {
    /// Rebuilds the original event for re-enqueueing.
    ///
    /// The download link is left empty: the staged file was removed when the
    /// event failed, so a replay needs a fresh download task.
    pub fn to_new_event(&self) -> NewEvent {
        NewEvent {
            owner_user_id: self.owner_user_id,
            kind: self.kind,
            payload: self.payload.clone(),
            status_message: self.status_message,
            download_task_id: None,
        }
    }
}

/// Counts of documents in each queue state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending_events: u64,
    pub claimed_events: u64,
    pub pending_downloads: u64,
    pub completed_downloads: u64,
    pub failed_downloads: u64,
    pub failures: u64,
}

/// A downloaded file ready to attach to a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub mime_type: String,
}

/// A note creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    /// HTML fragment for the note body.
    pub text: String,
    pub notebook_guid: String,
    pub files: Vec<StagedFile>,
    /// Title the note after the leading text rather than `title` when text is present.
    pub title_from_text: bool,
}

/// A binary resource embedded in a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteResource {
    pub file_name: String,
    pub mime_type: String,
    /// Hex digest referenced by the matching `en-media` tag.
    pub hash: String,
    pub data: Vec<u8>,
}

/// A note as read from the note store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub guid: String,
    pub title: String,
    pub notebook_guid: String,
    /// Full ENML document.
    pub content: String,
    pub resources: Vec<NoteResource>,
}
