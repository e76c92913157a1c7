// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat platform client used for status feedback and file lookups.

use async_trait::async_trait;

use crate::error::NotebotError;
use crate::types::StatusMessageRef;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends a message and returns a reference usable for later edits.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<StatusMessageRef, NotebotError>;

    /// Replaces the text of a previously sent message.
    async fn edit_message_text(
        &self,
        message: &StatusMessageRef,
        text: &str,
    ) -> Result<(), NotebotError>;

    /// Resolves a file reference to a short-lived download URL.
    async fn resolve_file_url(&self, file_ref: &str) -> Result<String, NotebotError>;
}
