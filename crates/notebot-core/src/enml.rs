// SPDX-FileCopyrightText: 2026 Notebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ENML note bodies.
//!
//! A body is rebuilt from the prior `<en-note>` content followed by the new
//! fragments, so appending never drops what was already there.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::types::{Note, NoteDraft, NoteResource};

const HEADER: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<!DOCTYPE en-note SYSTEM "http://xml.evernote.com/pub/enml2.dtd">"#,
);

const SEPARATOR: &str = "<br />";

/// Length of the text prefix used as a note title.
const TITLE_CHARS: usize = 15;

static EN_NOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<en-note[^>]*>(.*)</en-note>").unwrap());

static PROLOG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*<\?xml[^>]*\?>\s*(?:<!DOCTYPE[^>]*>\s*)?").unwrap()
});

/// Returns the inner markup of an ENML document.
///
/// Content without an `<en-note>` wrapper is kept as bare markup, minus any
/// XML prolog.
pub fn inner_body(content: &str) -> &str {
    match EN_NOTE.captures(content).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => match PROLOG.find(content) {
            Some(prolog) => &content[prolog.end()..],
            None => content,
        },
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
}

/// Builds a note body from prior content plus appended fragments.
#[derive(Debug, Clone, Default)]
pub struct NoteBody {
    prior: String,
    fragments: Vec<String>,
    resources: Vec<NoteResource>,
}

impl NoteBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing note, keeping its markup and resources.
    pub fn from_note(note: &Note) -> Self {
        Self {
            prior: inner_body(&note.content).to_string(),
            fragments: Vec::new(),
            resources: note.resources.clone(),
        }
    }

    /// Appends a text fragment. Empty text is ignored.
    pub fn push_text(&mut self, text: &str) -> &mut Self {
        if !text.is_empty() {
            self.fragments.push(format!("{SEPARATOR}{}", escape(text)));
        }
        self
    }

    /// Appends a file as an `en-media` reference with its resource.
    pub fn push_resource(&mut self, resource: NoteResource) -> &mut Self {
        self.fragments.push(format!(
            r#"{SEPARATOR}<en-media type="{}" hash="{}" />"#,
            resource.mime_type, resource.hash
        ));
        self.resources.push(resource);
        self
    }

    pub fn render(&self) -> String {
        format!(
            "{HEADER}<en-note>{}{}</en-note>",
            self.prior,
            self.fragments.concat()
        )
    }

    pub fn resources(&self) -> &[NoteResource] {
        &self.resources
    }

    pub fn into_parts(self) -> (String, Vec<NoteResource>) {
        let content = self.render();
        (content, self.resources)
    }
}

/// Builds a resource from file bytes, hashing them for the `en-media` tag.
pub fn resource(
    file_name: impl Into<String>,
    mime_type: impl Into<String>,
    data: Vec<u8>,
) -> NoteResource {
    NoteResource {
        file_name: file_name.into(),
        mime_type: mime_type.into(),
        hash: hex::encode(Sha256::digest(&data)),
        data,
    }
}

/// The title a created note is stored under.
pub fn display_title(draft: &NoteDraft, prefix: &str) -> String {
    if !draft.title_from_text {
        return draft.title.clone();
    }
    let text = draft.text.trim();
    let base = if text.is_empty() {
        draft.title.clone()
    } else if text.chars().count() > TITLE_CHARS {
        format!("{}...", text.chars().take(TITLE_CHARS).collect::<String>())
    } else {
        text.to_string()
    };
    let base = base.replace(['\n', '\r'], " ");
    let base = base.trim();
    if prefix.is_empty() {
        base.to_string()
    } else {
        format!("{prefix} {base}")
    }
}

/// The note a store creates for `draft`.
///
/// `resources` are the draft's files, already read, in draft order.
pub fn note_from_draft(
    guid: impl Into<String>,
    draft: &NoteDraft,
    title_prefix: &str,
    resources: Vec<NoteResource>,
) -> Note {
    let mut body = NoteBody::new();
    body.push_text(&draft.text);
    for resource in resources {
        body.push_resource(resource);
    }
    let (content, resources) = body.into_parts();
    Note {
        guid: guid.into(),
        title: display_title(draft, title_prefix),
        notebook_guid: draft.notebook_guid.clone(),
        content,
        resources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_with(content: &str) -> Note {
        Note {
            guid: "n1".into(),
            title: "t".into(),
            notebook_guid: "nb".into(),
            content: content.into(),
            resources: Vec::new(),
        }
    }

    fn draft(text: &str) -> NoteDraft {
        NoteDraft {
            title: "Text".into(),
            text: text.into(),
            notebook_guid: "nb".into(),
            files: Vec::new(),
            title_from_text: true,
        }
    }

    #[test]
    fn append_keeps_prior_content() {
        let mut first = NoteBody::new();
        first.push_text("one");
        let note = note_with(&first.render());

        let mut second = NoteBody::from_note(&note);
        second.push_text("two");
        let rendered = second.render();

        let body = inner_body(&rendered);
        let one = body.find("one").unwrap();
        let two = body.find("two").unwrap();
        assert!(one < two, "prior text must precede appended text: {body}");
        assert!(rendered.starts_with("<?xml"));
    }

    #[test]
    fn text_is_ampersand_escaped() {
        let mut body = NoteBody::new();
        body.push_text("salt & pepper");
        assert!(body.render().contains("salt &amp; pepper"));
    }

    #[test]
    fn resources_are_referenced_by_hash() {
        let mut body = NoteBody::new();
        let res = resource("p.jpg", "image/jpeg", b"abc".to_vec());
        let hash = res.hash.clone();
        body.push_resource(res);
        let (content, resources) = body.into_parts();
        let tag = format!(r#"<en-media type="image/jpeg" hash="{hash}" />"#);
        assert!(content.contains(&tag));
        assert_eq!(resources.len(), 1);
    }

    #[test]
    fn inner_body_of_bare_markup_is_identity() {
        assert_eq!(inner_body("<b>hi</b>"), "<b>hi</b>");
    }

    #[test]
    fn unwrapped_documents_keep_their_markup() {
        assert_eq!(inner_body("<?xml version=\"1.0\"?><oops/>"), "<oops/>");
        let note = note_with("<?xml version=\"1.0\"?><p>kept</p>");
        let mut body = NoteBody::from_note(&note);
        body.push_text("new");
        let rendered = body.render();
        assert!(rendered.contains("<p>kept</p><br />new"), "{rendered}");
    }

    #[test]
    fn rendering_without_fragments_adds_no_separator() {
        let note = note_with(&NoteBody::new().render());
        let rendered = NoteBody::from_note(&note).render();
        assert!(rendered.ends_with("<en-note></en-note>"), "{rendered}");
    }

    #[test]
    fn long_text_titles_are_truncated() {
        assert_eq!(display_title(&draft("hello"), "[BOT]"), "[BOT] hello");
        assert_eq!(
            display_title(&draft("abcdefghijklmnopqrstuvwxyz"), "[BOT]"),
            "[BOT] abcdefghijklmno..."
        );
        assert_eq!(display_title(&draft(""), "[BOT]"), "[BOT] Text");
    }

    #[test]
    fn fixed_titles_pass_through() {
        let mut d = draft("ignored");
        d.title = "[Files]".into();
        d.title_from_text = false;
        assert_eq!(display_title(&d, "[BOT]"), "[Files]");
    }

    #[test]
    fn note_from_draft_embeds_text_and_resources() {
        let res = resource("a.png", "image/png", vec![1, 2, 3]);
        let note = note_from_draft("g1", &draft("caption"), "[BOT]", vec![res.clone()]);
        assert_eq!(note.guid, "g1");
        assert_eq!(note.title, "[BOT] caption");
        assert_eq!(note.notebook_guid, "nb");
        assert_eq!(note.resources, vec![res.clone()]);
        let body = inner_body(&note.content);
        assert!(body.find("caption").unwrap() < body.find(&res.hash).unwrap());
    }
}
