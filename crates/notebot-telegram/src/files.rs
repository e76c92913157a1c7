// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Download URL construction for files hosted by the Bot API.

/// Builds `{api}/file/bot{token}/{path}`.
///
/// The result embeds the bot token, so it must never be logged.
pub fn file_download_url(api_url: &str, token: &str, file_path: &str) -> String {
    format!(
        "{}/file/bot{}/{}",
        api_url.trim_end_matches('/'),
        token,
        file_path.trim_start_matches('/')
    )
}
