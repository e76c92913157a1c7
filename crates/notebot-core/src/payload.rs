// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The subset of the chat platform's message shape the pipeline reads.
//!
//! Unknown fields are ignored so raw webhook payloads deserialize as-is.

use serde::{Deserialize, Serialize};

use crate::types::EventKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photo: Vec<PhotoSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<FileAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<FileAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<FileAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<Venue>,
}

/// One resolution of a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// A document, video, or voice file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl FileAttachment {
    fn as_remote(&self) -> RemoteFile<'_> {
        RemoteFile {
            file_id: &self.file_id,
            file_size: self.file_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub location: Location,
    pub title: String,
    pub address: String,
    #[serde(default)]
    pub foursquare_id: Option<String>,
}

/// The remote file an event depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteFile<'a> {
    pub file_id: &'a str,
    pub file_size: Option<i64>,
}

impl ChatMessage {
    /// Determines which handler the message belongs to.
    ///
    /// File kinds win over text so a captioned photo is stored as a photo.
    pub fn classify(&self) -> Option<EventKind> {
        if !self.photo.is_empty() {
            Some(EventKind::Photo)
        } else if self.document.is_some() {
            Some(EventKind::Document)
        } else if self.video.is_some() {
            Some(EventKind::Video)
        } else if self.voice.is_some() {
            Some(EventKind::Voice)
        } else if self.location.is_some() || self.venue.is_some() {
            Some(EventKind::Location)
        } else if self.text.is_some() {
            Some(EventKind::Text)
        } else {
            None
        }
    }

    /// Text if present, otherwise the caption, otherwise empty.
    pub fn text_or_caption(&self) -> &str {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .unwrap_or_default()
    }

    /// The largest photo variant by byte size.
    ///
    /// Ties keep the variant listed first.
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        let mut best: Option<&PhotoSize> = None;
        for size in &self.photo {
            match best {
                Some(current) if size.file_size.unwrap_or(0) <= current.file_size.unwrap_or(0) => {}
                _ => best = Some(size),
            }
        }
        best
    }

    /// The primary attachment for a file-bearing kind.
    pub fn primary_file(&self, kind: EventKind) -> Option<RemoteFile<'_>> {
        match kind {
            EventKind::Photo => self.largest_photo().map(|p| RemoteFile {
                file_id: &p.file_id,
                file_size: p.file_size,
            }),
            EventKind::Document => self.document.as_ref().map(FileAttachment::as_remote),
            EventKind::Video => self.video.as_ref().map(FileAttachment::as_remote),
            EventKind::Voice => self.voice.as_ref().map(FileAttachment::as_remote),
            EventKind::Text | EventKind::Location => None,
        }
    }

    /// The point a location event refers to, taken from the venue when present.
    pub fn point(&self) -> Option<Location> {
        self.location.or_else(|| self.venue.as_ref().map(|v| v.location))
    }
}
