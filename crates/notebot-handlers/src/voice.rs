// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice message transcoding.

use std::path::{Path, PathBuf};

use notebot_core::StagedFile;
use tokio::process::Command;
use tracing::{debug, warn};

pub const TRANSCODED_MIME: &str = "audio/wav";
pub const ORIGINAL_MIME: &str = "audio/ogg";

/// Where the transcoded copy of `original` is written.
pub fn transcoded_path(original: &Path) -> PathBuf {
    let mut path = original.as_os_str().to_owned();
    path.push(".wav");
    PathBuf::from(path)
}

/// Converts an Opus voice note to WAV with `command <in> <out>`.
///
/// Any failure falls back to the original file so the event still produces
/// a note.
pub async fn transcode(command: &str, original: &Path) -> StagedFile {
    let target = transcoded_path(original);
    match Command::new(command)
        .arg(original)
        .arg(&target)
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(output) if output.status.success() && target.exists() => {
            debug!(path = %target.display(), "voice transcoded");
            return StagedFile {
                path: target,
                mime_type: TRANSCODED_MIME.to_string(),
            };
        }
        Ok(output) => warn!(
            command,
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "voice transcoding failed, using original file"
        ),
        Err(e) => warn!(command, error = %e, "voice transcoder unavailable, using original file"),
    }
    StagedFile {
        path: original.to_path_buf(),
        mime_type: ORIGINAL_MIME.to_string(),
    }
}
