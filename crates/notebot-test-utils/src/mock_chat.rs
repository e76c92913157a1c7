// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat client for deterministic testing.
//!
//! `MockChat` implements `ChatClient` by capturing every sent and edited
//! message for assertion, and resolves file references against a
//! configurable base URL (typically a wiremock server).

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use notebot_core::traits::adapter::PluginAdapter;
use notebot_core::{AdapterType, ChatClient, HealthStatus, NotebotError, StatusMessageRef};

/// A message passed to `send_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub reference: StatusMessageRef,
    pub text: String,
}

/// A message passed to `edit_message_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedMessage {
    pub reference: StatusMessageRef,
    pub text: String,
}

pub struct MockChat {
    sent: Mutex<Vec<SentMessage>>,
    edits: Mutex<Vec<EditedMessage>>,
    next_message_id: AtomicI64,
    file_base_url: String,
    fail_edits: AtomicBool,
}

impl MockChat {
    pub fn new() -> Self {
        Self::with_file_base_url("http://files.invalid")
    }

    /// File references resolve to `{base_url}/{file_ref}`.
    pub fn with_file_base_url(base_url: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(1),
            file_base_url: base_url.into().trim_end_matches('/').to_string(),
            fail_edits: AtomicBool::new(false),
        }
    }

    /// Makes every later edit fail with a channel error.
    pub fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn edits(&self) -> Vec<EditedMessage> {
        self.edits.lock().await.clone()
    }

    /// Edits applied to one status message, oldest first.
    pub async fn edits_for(&self, reference: &StatusMessageRef) -> Vec<String> {
        self.edits
            .lock()
            .await
            .iter()
            .filter(|e| e.reference == *reference)
            .map(|e| e.text.clone())
            .collect()
    }
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChat {
    fn name(&self) -> &str {
        "mock-chat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, NotebotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), NotebotError> {
        Ok(())
    }
}

#[async_trait]
impl ChatClient for MockChat {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<StatusMessageRef, NotebotError> {
        let reference = StatusMessageRef {
            chat_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
        };
        self.sent.lock().await.push(SentMessage {
            reference,
            text: text.to_string(),
        });
        Ok(reference)
    }

    async fn edit_message_text(
        &self,
        message: &StatusMessageRef,
        text: &str,
    ) -> Result<(), NotebotError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(NotebotError::channel("mock edit failure"));
        }
        self.edits.lock().await.push(EditedMessage {
            reference: *message,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn resolve_file_url(&self, file_ref: &str) -> Result<String, NotebotError> {
        Ok(format!("{}/{file_ref}", self.file_base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_get_distinct_references() {
        let chat = MockChat::new();
        let a = chat.send_message(5, "one").await.unwrap();
        let b = chat.send_message(5, "two").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(chat.sent_messages().await.len(), 2);
    }

    #[tokio::test]
    async fn edits_are_tracked_per_message() {
        let chat = MockChat::new();
        let a = chat.send_message(5, "one").await.unwrap();
        let b = chat.send_message(5, "two").await.unwrap();
        chat.edit_message_text(&a, "done").await.unwrap();
        chat.edit_message_text(&b, "failed").await.unwrap();
        assert_eq!(chat.edits_for(&a).await, vec!["done".to_string()]);
        assert_eq!(chat.edits().await.len(), 2);
    }

    #[tokio::test]
    async fn failing_edits_record_nothing() {
        let chat = MockChat::new();
        let a = chat.send_message(5, "one").await.unwrap();
        chat.fail_edits(true);
        assert!(chat.edit_message_text(&a, "done").await.is_err());
        assert!(chat.edits().await.is_empty());
    }

    #[tokio::test]
    async fn file_urls_join_the_base() {
        let chat = MockChat::with_file_base_url("http://127.0.0.1:9000/");
        assert_eq!(
            chat.resolve_file_url("photos/a.jpg").await.unwrap(),
            "http://127.0.0.1:9000/photos/a.jpg"
        );
    }
}
