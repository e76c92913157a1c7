// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handler chain for the Notebot pipeline.
//!
//! Maps each event kind to the note-store write it produces, in either
//! one-note mode (append to a pinned note) or multiple-notes mode (a new
//! note per event).

pub mod assets;
pub mod chain;
pub mod context;
pub mod location;
pub mod voice;

pub use chain::HandlerChain;
pub use context::HandlerContext;
