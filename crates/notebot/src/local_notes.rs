// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory-backed note store for running the pipeline without a hosted
//! note service.
//!
//! Each note is `<root>/<guid>.enml` plus a `<guid>.json` sidecar holding
//! the title, notebook, and resource list. Resource bytes live once under
//! `<root>/resources/<hash>`. Links are `file://` URLs of the ENML file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use notebot_core::enml;
use notebot_core::{
    AdapterType, HealthStatus, Note, NoteDraft, NoteResource, NoteStore, NoteStoreError,
    NotebotError, PluginAdapter,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct StoredResource {
    file_name: String,
    mime_type: String,
    hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredNote {
    guid: String,
    title: String,
    notebook_guid: String,
    resources: Vec<StoredResource>,
}

pub struct LocalNoteStore {
    root: PathBuf,
    title_prefix: String,
}

impl LocalNoteStore {
    pub fn new(root: impl Into<PathBuf>, title_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            title_prefix: title_prefix.into(),
        }
    }

    fn content_path(&self, guid: &str) -> PathBuf {
        self.root.join(format!("{guid}.enml"))
    }

    fn meta_path(&self, guid: &str) -> PathBuf {
        self.root.join(format!("{guid}.json"))
    }

    fn resource_path(&self, hash: &str) -> PathBuf {
        self.root.join("resources").join(hash)
    }

    async fn write(&self, note: &Note) -> Result<(), NoteStoreError> {
        tokio::fs::create_dir_all(self.root.join("resources"))
            .await
            .map_err(|e| io_error(&self.root, e))?;

        for resource in &note.resources {
            let path = self.resource_path(&resource.hash);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                write_replacing(&path, &resource.data).await?;
            }
        }

        let meta = StoredNote {
            guid: note.guid.clone(),
            title: note.title.clone(),
            notebook_guid: note.notebook_guid.clone(),
            resources: note
                .resources
                .iter()
                .map(|r| StoredResource {
                    file_name: r.file_name.clone(),
                    mime_type: r.mime_type.clone(),
                    hash: r.hash.clone(),
                })
                .collect(),
        };
        let json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| NoteStoreError::Api(format!("failed to encode note {}: {e}", note.guid)))?;

        write_replacing(&self.content_path(&note.guid), note.content.as_bytes()).await?;
        write_replacing(&self.meta_path(&note.guid), &json).await
    }
}

fn io_error(path: &Path, e: std::io::Error) -> NoteStoreError {
    NoteStoreError::Api(format!("{}: {e}", path.display()))
}

/// Guids are generated here, but lookups take caller input.
fn check_guid(guid: &str) -> Result<(), NoteStoreError> {
    let safe = !guid.is_empty()
        && guid.len() <= 64
        && guid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if safe {
        Ok(())
    } else {
        Err(NoteStoreError::NoteNotFound {
            guid: guid.to_string(),
        })
    }
}

fn check_token(token: &str) -> Result<(), NoteStoreError> {
    if token.trim().is_empty() {
        Err(NoteStoreError::TokenExpired)
    } else {
        Ok(())
    }
}

async fn write_replacing(path: &Path, data: &[u8]) -> Result<(), NoteStoreError> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".tmp");
    let partial = PathBuf::from(partial);
    tokio::fs::write(&partial, data)
        .await
        .map_err(|e| io_error(&partial, e))?;
    tokio::fs::rename(&partial, path)
        .await
        .map_err(|e| io_error(path, e))
}

async fn read_files(draft: &NoteDraft) -> Result<Vec<NoteResource>, NoteStoreError> {
    let mut resources = Vec::with_capacity(draft.files.len());
    for file in &draft.files {
        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|e| io_error(&file.path, e))?;
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        resources.push(enml::resource(name, file.mime_type.clone(), data));
    }
    Ok(resources)
}

#[async_trait]
impl PluginAdapter for LocalNoteStore {
    fn name(&self) -> &str {
        "local-notes"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::NoteStore
    }

    async fn health_check(&self) -> Result<HealthStatus, NotebotError> {
        match tokio::fs::create_dir_all(&self.root).await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "{} is not writable: {e}",
                self.root.display()
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), NotebotError> {
        Ok(())
    }
}

#[async_trait]
impl NoteStore for LocalNoteStore {
    async fn create_note(&self, token: &str, draft: &NoteDraft) -> Result<String, NoteStoreError> {
        check_token(token)?;
        let resources = read_files(draft).await?;
        let guid = uuid::Uuid::new_v4().to_string();
        let note = enml::note_from_draft(guid.clone(), draft, &self.title_prefix, resources);
        self.write(&note).await?;
        debug!(note = %guid, title = %note.title, "local note created");
        Ok(guid)
    }

    async fn get_note(&self, token: &str, guid: &str) -> Result<Note, NoteStoreError> {
        check_token(token)?;
        check_guid(guid)?;
        let meta = match tokio::fs::read(self.meta_path(guid)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(NoteStoreError::NoteNotFound {
                    guid: guid.to_string(),
                });
            }
            Err(e) => return Err(io_error(&self.meta_path(guid), e)),
        };
        let meta: StoredNote = serde_json::from_slice(&meta)
            .map_err(|e| NoteStoreError::Api(format!("corrupt note {guid}: {e}")))?;
        let content = tokio::fs::read_to_string(self.content_path(guid))
            .await
            .map_err(|e| io_error(&self.content_path(guid), e))?;

        let mut resources = Vec::with_capacity(meta.resources.len());
        for stored in meta.resources {
            let path = self.resource_path(&stored.hash);
            let data = tokio::fs::read(&path).await.map_err(|e| io_error(&path, e))?;
            resources.push(NoteResource {
                file_name: stored.file_name,
                mime_type: stored.mime_type,
                hash: stored.hash,
                data,
            });
        }

        Ok(Note {
            guid: meta.guid,
            title: meta.title,
            notebook_guid: meta.notebook_guid,
            content,
            resources,
        })
    }

    async fn update_note(&self, token: &str, note: &Note) -> Result<(), NoteStoreError> {
        check_token(token)?;
        check_guid(&note.guid)?;
        if !tokio::fs::try_exists(self.meta_path(&note.guid))
            .await
            .unwrap_or(false)
        {
            return Err(NoteStoreError::NoteNotFound {
                guid: note.guid.clone(),
            });
        }
        self.write(note).await
    }

    async fn note_link(&self, token: &str, guid: &str) -> Result<String, NoteStoreError> {
        check_token(token)?;
        check_guid(guid)?;
        Ok(format!("file://{}", self.content_path(guid).display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebot_core::StagedFile;

    fn draft(text: &str) -> NoteDraft {
        NoteDraft {
            title: "Text".into(),
            text: text.into(),
            notebook_guid: "nb-1".into(),
            files: Vec::new(),
            title_from_text: true,
        }
    }

    #[tokio::test]
    async fn created_note_reads_back_with_resources() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("photo.jpg");
        tokio::fs::write(&file, b"jpeg bytes").await.unwrap();
        let store = LocalNoteStore::new(dir.path().join("notes"), "[BOT]");

        let mut with_file = draft("a long caption for this photo");
        with_file.files.push(StagedFile {
            path: file,
            mime_type: "image/jpeg".into(),
        });
        let guid = store.create_note("tok", &with_file).await.unwrap();
        let note = store.get_note("tok", &guid).await.unwrap();

        assert_eq!(note.title, "[BOT] a long caption ...");
        assert_eq!(note.notebook_guid, "nb-1");
        assert_eq!(note.resources.len(), 1);
        assert_eq!(note.resources[0].data, b"jpeg bytes");
        assert!(note.content.contains(&note.resources[0].hash));
    }

    #[tokio::test]
    async fn update_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalNoteStore::new(dir.path(), "");
        let guid = store.create_note("tok", &draft("one")).await.unwrap();

        let mut note = store.get_note("tok", &guid).await.unwrap();
        let mut body = enml::NoteBody::from_note(&note);
        body.push_text("two");
        note.content = body.render();
        store.update_note("tok", &note).await.unwrap();

        let reread = store.get_note("tok", &guid).await.unwrap();
        assert!(reread.content.contains("one"));
        assert!(reread.content.contains("two"));
    }

    #[tokio::test]
    async fn unknown_and_unsafe_guids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalNoteStore::new(dir.path(), "");
        for guid in ["missing", "../etc/passwd", ""] {
            assert_eq!(
                store.get_note("tok", guid).await,
                Err(NoteStoreError::NoteNotFound { guid: guid.into() })
            );
        }
    }

    #[tokio::test]
    async fn empty_token_reads_as_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalNoteStore::new(dir.path(), "");
        assert_eq!(
            store.create_note(" ", &draft("x")).await,
            Err(NoteStoreError::TokenExpired)
        );
    }

    #[tokio::test]
    async fn links_point_at_the_enml_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalNoteStore::new(dir.path(), "");
        let guid = store.create_note("tok", &draft("x")).await.unwrap();
        let link = store.note_link("tok", &guid).await.unwrap();
        assert!(link.starts_with("file://"));
        assert!(link.ends_with(&format!("{guid}.enml")));
    }
}
