// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The note-taking service, reached through an opaque RPC client.

use async_trait::async_trait;

use crate::error::NoteStoreError;
use crate::types::{Note, NoteDraft};

/// Note-store operations.
///
/// Failures come back as [`NoteStoreError`] tags so callers can tell an
/// expired credential from a missing note or a transient outage.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Creates a note and returns its guid.
    async fn create_note(&self, token: &str, draft: &NoteDraft) -> Result<String, NoteStoreError>;

    /// Fetches a note including its content and resources.
    async fn get_note(&self, token: &str, guid: &str) -> Result<Note, NoteStoreError>;

    async fn update_note(&self, token: &str, note: &Note) -> Result<(), NoteStoreError>;

    /// A link that opens the note for its owner.
    async fn note_link(&self, token: &str, guid: &str) -> Result<String, NoteStoreError>;
}
