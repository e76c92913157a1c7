// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The handler chain: one variant per event kind.
//!
//! Every variant shares the same four steps. `get_text` and `get_files`
//! differ per kind; `execute` writes the note according to the user's mode;
//! `cleanup` removes whatever the event staged on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use notebot_core::enml::NoteBody;
use notebot_core::{
    ChatMessage, Event, EventKind, Note, NoteDraft, NoteStoreError, NotebotError, StagedFile,
    User, UserMode,
};
use tracing::{debug, info, warn};

use crate::assets;
use crate::context::HandlerContext;
use crate::location;
use crate::voice;

/// Default type for files the downloader could not identify.
const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerChain {
    Text,
    Photo,
    Video,
    Document,
    Voice,
    Location,
}

impl HandlerChain {
    /// The single handler registered for `kind`.
    pub fn for_kind(kind: EventKind) -> Self {
        match kind {
            EventKind::Text => HandlerChain::Text,
            EventKind::Photo => HandlerChain::Photo,
            EventKind::Video => HandlerChain::Video,
            EventKind::Document => HandlerChain::Document,
            EventKind::Voice => HandlerChain::Voice,
            EventKind::Location => HandlerChain::Location,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            HandlerChain::Text => EventKind::Text,
            HandlerChain::Photo => EventKind::Photo,
            HandlerChain::Video => EventKind::Video,
            HandlerChain::Document => EventKind::Document,
            HandlerChain::Voice => EventKind::Voice,
            HandlerChain::Location => EventKind::Location,
        }
    }

    /// Note text for the message.
    pub fn get_text(&self, message: &ChatMessage) -> String {
        match self {
            HandlerChain::Location => match message.point() {
                Some(point) => location::location_html(point, message.venue.as_ref()),
                None => String::new(),
            },
            _ => message.text_or_caption().to_string(),
        }
    }

    /// The staged files to attach, waiting for the download if needed.
    pub async fn get_files(
        &self,
        ctx: &HandlerContext,
        event: &Event,
    ) -> Result<Vec<StagedFile>, NotebotError> {
        if !self.kind().has_file() {
            return Ok(Vec::new());
        }

        let task = assets::wait_for_download(ctx, event).await?;
        let path = assets::local_file(event, &task).await?;

        let staged = match self {
            HandlerChain::Voice => voice::transcode(&ctx.settings.transcode_command, &path).await,
            _ => StagedFile {
                path,
                mime_type: task
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| FALLBACK_MIME.to_string()),
            },
        };
        Ok(vec![staged])
    }

    /// Writes the event into the user's note store.
    pub async fn execute(
        &self,
        ctx: &HandlerContext,
        user: &User,
        event: &Event,
    ) -> Result<(), NotebotError> {
        let message = event.message()?;
        let text = self.get_text(&message);
        let files = self.get_files(ctx, event).await?;

        let mode = match user.mode {
            Some(mode) => mode,
            None => {
                warn!(
                    user_id = user.id,
                    "user has no usable note mode, defaulting to multiple notes"
                );
                ctx.users.set_mode(user.id, UserMode::MultipleNotes).await?;
                UserMode::MultipleNotes
            }
        };

        match mode {
            UserMode::MultipleNotes => {
                let draft = NoteDraft {
                    title: self.kind().title().to_string(),
                    text,
                    notebook_guid: user.current_notebook.guid.clone(),
                    files,
                    title_from_text: true,
                };
                let guid = ctx
                    .notes
                    .create_note(&user.note_store_access_token, &draft)
                    .await?;
                debug!(event_id = event.id, note = %guid, "note created");
            }
            UserMode::OneNote => self.append_to_pinned(ctx, user, text, files).await?,
        }
        Ok(())
    }

    async fn append_to_pinned(
        &self,
        ctx: &HandlerContext,
        user: &User,
        text: String,
        files: Vec<StagedFile>,
    ) -> Result<(), NotebotError> {
        let token = &user.note_store_access_token;
        let mut note = pinned_note(ctx, user).await?;
        let mut body = NoteBody::from_note(&note);

        body.push_text(&text);
        if !files.is_empty() {
            // Attachments go to their own note; the pinned note links to it.
            let draft = NoteDraft {
                title: ctx.settings.files_note_title.clone(),
                text,
                notebook_guid: user.current_notebook.guid.clone(),
                files,
                title_from_text: false,
            };
            let files_guid = ctx.notes.create_note(token, &draft).await?;
            let link = ctx.notes.note_link(token, &files_guid).await?;
            body.push_text(&format!(
                "{}: <a href=\"{link}\">{link}</a>",
                self.kind().title()
            ));
        }

        let (content, resources) = body.into_parts();
        note.content = content;
        note.resources = resources;
        ctx.notes.update_note(token, &note).await?;
        Ok(())
    }

    /// Removes files staged for the event and its download task.
    ///
    /// Never fails: problems are logged and the event outcome stands.
    pub async fn cleanup(&self, ctx: &HandlerContext, event: &Event) {
        let Some(task_id) = event.download_task_id else {
            return;
        };
        let task = match ctx.store.get_download_task(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => return,
            Err(e) => {
                warn!(event_id = event.id, task_id, error = %e, "cleanup could not load download task");
                return;
            }
        };

        if let Some(path) = task.local_path.as_deref().map(PathBuf::from) {
            remove_staged(event, &path).await;
            if *self == HandlerChain::Voice {
                remove_staged(event, &voice::transcoded_path(&path)).await;
            }
        }
        if let Err(e) = ctx.store.delete_download_task(task_id).await {
            warn!(event_id = event.id, task_id, error = %e, "cleanup could not delete download task");
        }
    }
}

async fn remove_staged(event: &Event, path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(event_id = event.id, path = %path.display(), "staged file removed"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(
            event_id = event.id,
            path = %path.display(),
            error = %e,
            "failed to remove staged file"
        ),
    }
}

/// The user's pinned note for the current notebook, recreated if missing.
async fn pinned_note(ctx: &HandlerContext, user: &User) -> Result<Note, NotebotError> {
    let token = &user.note_store_access_token;
    if let Some(guid) = user.pinned_note() {
        match ctx.notes.get_note(token, guid).await {
            Ok(note) => return Ok(note),
            Err(NoteStoreError::NoteNotFound { .. }) => {
                warn!(user_id = user.id, note = guid, "pinned note no longer exists");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let notebook_guid = user.current_notebook.guid.clone();
    let draft = NoteDraft {
        title: ctx.settings.pinned_note_title.clone(),
        text: String::new(),
        notebook_guid: notebook_guid.clone(),
        files: Vec::new(),
        title_from_text: false,
    };
    let guid = ctx.notes.create_note(token, &draft).await?;
    ctx.users.set_place(user.id, &notebook_guid, &guid).await?;
    info!(user_id = user.id, note = %guid, "pinned note created");
    Ok(ctx.notes.get_note(token, &guid).await?)
}
