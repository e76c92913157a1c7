// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per collection.

pub mod downloads;
pub mod events;
pub mod failures;
pub mod stats;
pub mod users;
