// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory note store with call capture and injectable failures.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use notebot_core::enml;
use notebot_core::{Note, NoteDraft, NoteResource, NoteStore, NoteStoreError};

/// One completed note-store call, in completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteCall {
    Create { token: String, draft: NoteDraft, guid: String },
    Get { token: String, guid: String },
    Update { token: String, guid: String },
    Link { token: String, guid: String },
}

impl NoteCall {
    pub fn token(&self) -> &str {
        match self {
            NoteCall::Create { token, .. }
            | NoteCall::Get { token, .. }
            | NoteCall::Update { token, .. }
            | NoteCall::Link { token, .. } => token,
        }
    }
}

#[derive(Default)]
struct Concurrency {
    current: usize,
    peak: usize,
}

pub struct MockNoteStore {
    title_prefix: String,
    notes: Mutex<HashMap<String, Note>>,
    calls: Mutex<Vec<NoteCall>>,
    failures: Mutex<VecDeque<NoteStoreError>>,
    delays: Mutex<HashMap<String, Duration>>,
    concurrency: Mutex<HashMap<String, Concurrency>>,
    next_guid: AtomicU64,
}

impl MockNoteStore {
    pub fn new() -> Self {
        Self::with_title_prefix("[BOT]")
    }

    pub fn with_title_prefix(prefix: impl Into<String>) -> Self {
        Self {
            title_prefix: prefix.into(),
            notes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            delays: Mutex::new(HashMap::new()),
            concurrency: Mutex::new(HashMap::new()),
            next_guid: AtomicU64::new(1),
        }
    }

    /// The next call, of any kind, fails with `error`. Queued failures are
    /// consumed in order.
    pub async fn fail_next(&self, error: NoteStoreError) {
        self.failures.lock().await.push_back(error);
    }

    /// Every call made with `token` sleeps for `delay` first.
    pub async fn set_delay(&self, token: &str, delay: Duration) {
        self.delays.lock().await.insert(token.to_string(), delay);
    }

    pub async fn calls(&self) -> Vec<NoteCall> {
        self.calls.lock().await.clone()
    }

    /// Drafts passed to `create_note`, in completion order.
    pub async fn created(&self) -> Vec<NoteDraft> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                NoteCall::Create { draft, .. } => Some(draft.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn note(&self, guid: &str) -> Option<Note> {
        self.notes.lock().await.get(guid).cloned()
    }

    pub async fn notes(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = self.notes.lock().await.values().cloned().collect();
        notes.sort_by(|a, b| a.guid.cmp(&b.guid));
        notes
    }

    pub async fn insert_note(&self, note: Note) {
        self.notes.lock().await.insert(note.guid.clone(), note);
    }

    pub async fn remove_note(&self, guid: &str) -> Option<Note> {
        self.notes.lock().await.remove(guid)
    }

    /// Highest number of overlapping calls seen for `token`.
    pub async fn peak_concurrency(&self, token: &str) -> usize {
        self.concurrency
            .lock()
            .await
            .get(token)
            .map(|c| c.peak)
            .unwrap_or(0)
    }

    async fn enter(&self, token: &str) -> Result<(), NoteStoreError> {
        {
            let mut all = self.concurrency.lock().await;
            let entry = all.entry(token.to_string()).or_default();
            entry.current += 1;
            entry.peak = entry.peak.max(entry.current);
        }
        let delay = self.delays.lock().await.get(token).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().await.pop_front() {
            Some(error) => {
                self.leave(token).await;
                Err(error)
            }
            None => Ok(()),
        }
    }

    async fn leave(&self, token: &str) {
        if let Some(entry) = self.concurrency.lock().await.get_mut(token) {
            entry.current = entry.current.saturating_sub(1);
        }
    }

    async fn finish(&self, call: NoteCall) {
        let token = call.token().to_string();
        self.calls.lock().await.push(call);
        self.leave(&token).await;
    }
}

impl Default for MockNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_resources(draft: &NoteDraft) -> Result<Vec<NoteResource>, NoteStoreError> {
    let mut resources = Vec::with_capacity(draft.files.len());
    for file in &draft.files {
        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|e| NoteStoreError::Api(format!("{}: {e}", file.path.display())))?;
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
impl NoteStore for MockNoteStore {
    async fn create_note(&self, token: &str, draft: &NoteDraft) -> Result<String, NoteStoreError> {
        self.enter(token).await?;
        let resources = match read_resources(draft).await {
            Ok(resources) => resources,
            Err(e) => {
                self.leave(token).await;
                return Err(e);
            }
        };
        let guid = format!("note-{}", self.next_guid.fetch_add(1, Ordering::SeqCst));
        let note = enml::note_from_draft(guid.clone(), draft, &self.title_prefix, resources);
        self.notes.lock().await.insert(guid.clone(), note);
        self.finish(NoteCall::Create {
            token: token.to_string(),
            draft: draft.clone(),
            guid: guid.clone(),
        })
        .await;
        Ok(guid)
    }

    async fn get_note(&self, token: &str, guid: &str) -> Result<Note, NoteStoreError> {
        self.enter(token).await?;
        let note = self.notes.lock().await.get(guid).cloned();
        self.finish(NoteCall::Get {
            token: token.to_string(),
            guid: guid.to_string(),
        })
        .await;
        note.ok_or_else(|| NoteStoreError::NoteNotFound {
            guid: guid.to_string(),
        })
    }

    async fn update_note(&self, token: &str, note: &Note) -> Result<(), NoteStoreError> {
        self.enter(token).await?;
        let found = {
            let mut notes = self.notes.lock().await;
            match notes.get_mut(&note.guid) {
                Some(stored) => {
                    *stored = note.clone();
                    true
                }
                None => false,
            }
        };
        self.finish(NoteCall::Update {
            token: token.to_string(),
            guid: note.guid.clone(),
        })
        .await;
        if found {
            Ok(())
        } else {
            Err(NoteStoreError::NoteNotFound {
                guid: note.guid.clone(),
            })
        }
    }

    async fn note_link(&self, token: &str, guid: &str) -> Result<String, NoteStoreError> {
        self.enter(token).await?;
        self.finish(NoteCall::Link {
            token: token.to_string(),
            guid: guid.to_string(),
        })
        .await;
        Ok(format!("https://notes.example/view/{guid}"))
    }
}
