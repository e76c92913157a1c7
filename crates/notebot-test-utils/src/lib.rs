// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Notebot integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockChat`] - Mock chat client capturing sends and status edits
//! - [`MockNoteStore`] - In-memory note store with injectable failures
//! - [`TestHarness`] - Temp work store plus builders for every consumer

pub mod harness;
pub mod mock_chat;
pub mod mock_note_store;

pub use harness::TestHarness;
pub use mock_chat::MockChat;
pub use mock_note_store::{MockNoteStore, NoteCall};
