// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Notebot pipeline.
//!
//! This crate provides the domain types (events, download tasks, users,
//! failure records, notes), the chat payload model, the error taxonomy, and
//! the adapter traits every backend implements.

pub mod enml;
pub mod error;
pub mod payload;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{FetchError, NoteStoreError, NotebotError};
pub use payload::ChatMessage;
pub use types::{
    AdapterType, ClaimRequest, DownloadTask, Event, EventKind, FailureRecord, HealthStatus,
    NewEvent, Note, NoteDraft, NoteResource, Notebook, QueueStats, StagedFile, StatusMessageRef,
    User, UserMode,
};

pub use traits::{
    ChatClient, FailureSink, NoteStore, PluginAdapter, StorageAdapter, UserDirectory, WorkStore,
};
