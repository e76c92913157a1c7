// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to linked accounts, plus the two fields the pipeline repairs.

use async_trait::async_trait;

use crate::error::NotebotError;
use crate::types::{User, UserMode};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fails with [`NotebotError::UserNotFound`] if the user never linked an account.
    async fn resolve_user(&self, user_id: i64) -> Result<User, NotebotError>;

    /// Inserts or replaces a user.
    async fn upsert_user(&self, user: &User) -> Result<(), NotebotError>;

    /// Points the user's pin for `notebook_guid` at `note_guid`.
    async fn set_place(
        &self,
        user_id: i64,
        notebook_guid: &str,
        note_guid: &str,
    ) -> Result<(), NotebotError>;

    async fn set_mode(&self, user_id: i64, mode: UserMode) -> Result<(), NotebotError>;
}
