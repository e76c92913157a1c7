// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Texts of the status message each event reports through.

use std::time::Duration;

use notebot_core::EventKind;

pub const ACCEPTED: &str = "🔄 Accepted";

pub const TOKEN_EXPIRED: &str =
    "⛔️ Evernote access token is expired. Send /start to get new token";

pub const FAILED: &str = "❌ Something went wrong. Please, try again";

pub fn saved(kind: EventKind, elapsed: Duration) -> String {
    format!("✅ {} saved ({:.2} s)", kind.title(), elapsed.as_secs_f64())
}
