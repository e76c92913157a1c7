// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle of a persistence backend.

use async_trait::async_trait;

use crate::error::NotebotError;
use crate::traits::adapter::PluginAdapter;

#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Opens the backend and applies pending migrations.
    async fn initialize(&self) -> Result<(), NotebotError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), NotebotError>;
}
