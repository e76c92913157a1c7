// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the pipeline's external collaborators.
//!
//! Every adapter uses `#[async_trait]` so it can be held as `Arc<dyn Trait>`
//! and swapped for a fake in tests.

pub mod adapter;
pub mod chat;
pub mod failure_sink;
pub mod note_store;
pub mod storage;
pub mod users;
pub mod work_store;

pub use adapter::PluginAdapter;
pub use chat::ChatClient;
pub use failure_sink::FailureSink;
pub use note_store::NoteStore;
pub use storage::StorageAdapter;
pub use users::UserDirectory;
pub use work_store::WorkStore;
