// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Naming and typing of downloaded files.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

static BOT_TOKEN_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/bot[^/]+/").unwrap());

/// Mime type of a fetched file.
///
/// Photo URLs carry a reliable extension while the file host often answers
/// with a generic content type, so the extension wins for JPEG and PNG.
pub fn mime_for(url: &str, content_type: Option<&str>) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        return "image/jpeg".to_string();
    }
    if path.ends_with(".png") {
        return "image/png".to_string();
    }
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string()
}

/// Local file name for a remote file reference.
pub fn local_file_name(remote_file_ref: &str) -> String {
    let name: String = remote_file_ref
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match name.trim_matches('.') {
        "" => "_".to_string(),
        _ => name,
    }
}

/// Where a task's file is written. The task id keeps two tasks for the same
/// remote file from sharing a path.
pub fn local_path(download_dir: &Path, task_id: i64, remote_file_ref: &str) -> PathBuf {
    download_dir.join(format!("{task_id}-{}", local_file_name(remote_file_ref)))
}

/// Masks the bot token embedded in file download URLs.
pub fn redact_url(url: &str) -> String {
    BOT_TOKEN_SEGMENT.replace(url, "/bot[REDACTED]/").into_owned()
}

/// Writes `data` beside `path` and renames it into place.
///
/// Readers never observe a partially written file. Blocking; run it on the
/// write pool.
pub fn write_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let mut file = std::fs::File::create(&partial)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&partial, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_overrides_content_type_for_images() {
        assert_eq!(
            mime_for("https://host/photos/file_1.JPG", Some("application/octet-stream")),
            "image/jpeg"
        );
        assert_eq!(mime_for("https://host/a.jpeg?x=1", None), "image/jpeg");
        assert_eq!(mime_for("https://host/a.png", Some("text/plain")), "image/png");
    }

    #[test]
    fn content_type_is_used_without_parameters() {
        assert_eq!(
            mime_for("https://host/voice/file_2.oga", Some("audio/ogg; codecs=opus")),
            "audio/ogg"
        );
    }

    #[test]
    fn missing_content_type_defaults_to_octet_stream() {
        assert_eq!(mime_for("https://host/doc", None), DEFAULT_MIME_TYPE);
        assert_eq!(mime_for("https://host/doc", Some("  ")), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn file_names_cannot_escape_the_download_dir() {
        assert_eq!(local_file_name("AgACAgIAAx-k_9"), "AgACAgIAAx-k_9");
        assert_eq!(local_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(local_file_name(".."), "_");
        assert_eq!(local_file_name(""), "_");
    }

    #[test]
    fn local_paths_are_unique_per_task() {
        let dir = Path::new("/var/downloads");
        assert_eq!(
            local_path(dir, 3, "photos/file_1.jpg"),
            PathBuf::from("/var/downloads/3-photos_file_1.jpg")
        );
        assert_ne!(local_path(dir, 3, "f"), local_path(dir, 4, "f"));
    }

    #[test]
    fn redacts_bot_token() {
        assert_eq!(
            redact_url("https://api.telegram.org/file/bot123:ABC/photos/x.jpg"),
            "https://api.telegram.org/file/bot[REDACTED]/photos/x.jpg"
        );
        assert_eq!(redact_url("http://localhost/files/x"), "http://localhost/files/x");
    }

    #[test]
    fn atomic_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file-a");
        write_atomically(&path, b"payload").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        assert!(!dir.path().join("file-a.part").exists());
    }
}
