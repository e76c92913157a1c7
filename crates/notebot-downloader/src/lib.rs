// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! FetchWorker for the Notebot pipeline.
//!
//! Materializes the binary attachments of file-bearing events (photo,
//! document, video, voice) into the local download directory, where the
//! handler chain picks them up.

pub mod files;
pub mod worker;

pub use worker::FetchWorker;
