// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborators shared by every handler.

use std::sync::Arc;
use std::time::Duration;

use notebot_config::model::NotesConfig;
use notebot_core::{NoteStore, UserDirectory, WorkStore};

/// How often a handler re-reads a pending download task.
pub const DEFAULT_ASSET_POLL: Duration = Duration::from_millis(250);

/// Everything a handler needs to turn an event into a note.
#[derive(Clone)]
pub struct HandlerContext {
    pub store: Arc<dyn WorkStore>,
    pub users: Arc<dyn UserDirectory>,
    pub notes: Arc<dyn NoteStore>,
    pub settings: NotesConfig,
    /// Upper bound on waiting for a linked download to complete.
    pub asset_wait: Duration,
    pub asset_poll: Duration,
}

impl HandlerContext {
    pub fn new(
        store: Arc<dyn WorkStore>,
        users: Arc<dyn UserDirectory>,
        notes: Arc<dyn NoteStore>,
        settings: NotesConfig,
        asset_wait: Duration,
    ) -> Self {
        Self {
            store,
            users,
            notes,
            settings,
            asset_wait,
            asset_poll: DEFAULT_ASSET_POLL,
        }
    }

    pub fn with_asset_poll(mut self, interval: Duration) -> Self {
        self.asset_poll = interval;
        self
    }
}
