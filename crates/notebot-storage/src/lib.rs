// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite work store for the Notebot pipeline.
//!
//! WAL-mode SQLite with embedded migrations holding the `events`,
//! `download_tasks`, `failed_events`, and `users` collections. Claims are
//! single-statement atomic updates, safe across processes sharing the file.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
