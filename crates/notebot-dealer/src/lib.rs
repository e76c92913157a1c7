// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event dispatch for the Notebot pipeline.
//!
//! The [`Dealer`] claims queued events, runs them through the handler chain
//! one user at a time, and reports every outcome back to the chat. The
//! [`Intake`] helper is the enqueue side used by the ingestion front end.

pub mod dealer;
pub mod intake;
pub mod lanes;
pub mod status;

pub use dealer::Dealer;
pub use intake::{Intake, classify};
