// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Notebot pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// The primary error type used across all Notebot adapter traits and pipeline stages.
#[derive(Debug, Error)]
pub enum NotebotError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Work store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat platform errors (send/edit failure, file lookup failure).
    #[error("chat error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Classified failure reported by the note-store client.
    #[error(transparent)]
    NoteStore(#[from] NoteStoreError),

    /// A remote attachment could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The owning user has no linked account.
    #[error("user {user_id} not found")]
    UserNotFound { user_id: i64 },

    /// An event needs a downloaded file that is not on disk.
    #[error("missing asset for event {event_id}: {detail}")]
    MissingAsset { event_id: i64, detail: String },

    /// The raw chat payload does not have the shape its kind requires.
    #[error("malformed payload: {0}")]
    Payload(String),

    /// Local filesystem failure while staging or writing a file.
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NotebotError {
    /// True when the note-store credential is no longer valid.
    ///
    /// Reprocessing such an event cannot succeed until the user re-links,
    /// so callers must not dead-letter it.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, NotebotError::NoteStore(NoteStoreError::TokenExpired))
    }

    /// Wraps any error as a storage failure.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        NotebotError::Storage {
            source: source.into(),
        }
    }

    pub fn channel(message: impl Into<String>) -> Self {
        NotebotError::Channel {
            message: message.into(),
            source: None,
        }
    }
}

/// Tagged result of a note-store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteStoreError {
    /// The access token has expired or was revoked.
    #[error("note store access token is expired")]
    TokenExpired,

    /// The service asked the caller to back off.
    #[error("note store rate limit reached (retry after {retry_after_secs} s)")]
    RateLimitReached { retry_after_secs: u64 },

    /// The token is valid but lacks permission for the requested operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The referenced note no longer exists.
    #[error("note {guid} not found")]
    NoteNotFound { guid: String },

    /// Any other store failure.
    #[error("note store error: {0}")]
    Api(String),
}

/// Non-success response while fetching a remote attachment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{url} - Response: {status}, {body}")]
pub struct FetchError {
    pub status: u16,
    pub body: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_token_expiry_is_a_credential_failure() {
        assert!(NotebotError::from(NoteStoreError::TokenExpired).is_credential_failure());

        let others = [
            NotebotError::from(NoteStoreError::RateLimitReached {
                retry_after_secs: 30,
            }),
            NotebotError::from(NoteStoreError::PermissionDenied("read only".into())),
            NotebotError::from(NoteStoreError::NoteNotFound { guid: "g".into() }),
            NotebotError::UserNotFound { user_id: 1 },
            NotebotError::Internal("boom".into()),
        ];
        for err in &others {
            assert!(!err.is_credential_failure(), "{err} must not be a credential failure");
        }
    }

    #[test]
    fn fetch_error_display_carries_status_body_and_url() {
        let err = FetchError {
            status: 404,
            body: "Not Found".into(),
            url: "https://files.example/abc".into(),
        };
        assert_eq!(
            err.to_string(),
            "https://files.example/abc - Response: 404, Not Found"
        );
    }
}
