//! # Editor Session
//!
//! The sync state of one open letter as an explicit state machine. The
//! session keeps three copies of the edited value:
//!
//! - `draft`: what the user is typing;
//! - `committed`: what the server last confirmed;
//! - `preview`: what the print preview currently shows.
//!
//! Every transition is a pure function from session and event to session.
//! Dirtiness and autosave readiness are derived, never stored.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Letter;

/// Something that happened to an open session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent<T> {
    /// A fresh copy arrived from the server.
    LoadRemote { value: T, at: DateTime<Utc> },
    /// The user changed the draft.
    EditLocal { value: T, at: DateTime<Utc> },
    /// Push the draft into the preview.
    ApplyDraftToPreview,
    /// The server stored `saved`.
    AutosaveSucceeded { saved: T, at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorSession<T> {
    draft: T,
    committed: T,
    preview: T,
    last_synced_at: Option<DateTime<Utc>>,
    last_edit_at: Option<DateTime<Utc>>,
}

impl<T: Clone + PartialEq> EditorSession<T> {
    /// A session that has not talked to the server yet.
    pub fn new(initial: T) -> Self {
        Self {
            draft: initial.clone(),
            committed: initial.clone(),
            preview: initial,
            last_synced_at: None,
            last_edit_at: None,
        }
    }

    pub fn draft(&self) -> &T {
        &self.draft
    }

    pub fn committed(&self) -> &T {
        &self.committed
    }

    pub fn preview(&self) -> &T {
        &self.preview
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    /// The draft differs from what the server has.
    pub fn is_dirty(&self) -> bool {
        self.draft != self.committed
    }

    /// Dirty, and the last edit is at least `debounce` old.
    pub fn needs_autosave(&self, now: DateTime<Utc>, debounce: Duration) -> bool {
        self.is_dirty() && self.last_edit_at.map_or(true, |edited| now - edited >= debounce)
    }

    pub fn reduce(self, event: SessionEvent<T>) -> Self {
        match event {
            SessionEvent::LoadRemote { value, at } => {
                if self.is_dirty() {
                    // Unsaved local edits win over the refreshed copy.
                    Self {
                        committed: value,
                        last_synced_at: Some(at),
                        ..self
                    }
                } else {
                    Self {
                        draft: value.clone(),
                        preview: value.clone(),
                        committed: value,
                        last_synced_at: Some(at),
                        ..self
                    }
                }
            }
            SessionEvent::EditLocal { value, at } => Self {
                draft: value,
                last_edit_at: Some(at),
                ..self
            },
            SessionEvent::ApplyDraftToPreview => Self {
                preview: self.draft.clone(),
                ..self
            },
            SessionEvent::AutosaveSucceeded { saved, at } => Self {
                committed: saved,
                last_synced_at: Some(at),
                ..self
            },
        }
    }
}

/// The fields of a letter the editor changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterDraft {
    pub subject: String,
    pub content_html: String,
    pub salutation_override: Option<String>,
    pub closing_formula: Option<String>,
    pub closing_name: Option<String>,
    pub closing_title: Option<String>,
    pub show_pagination: Option<bool>,
}

impl LetterDraft {
    pub fn from_letter(letter: &Letter) -> Self {
        Self {
            subject: letter.subject.clone().unwrap_or_default(),
            content_html: letter.content_html.clone().unwrap_or_default(),
            salutation_override: letter.salutation_override.clone(),
            closing_formula: letter.closing_formula.clone(),
            closing_name: letter.closing_name.clone(),
            closing_title: letter.closing_title.clone(),
            show_pagination: letter.show_pagination,
        }
    }

    /// `letter` with this draft's fields written over it. The structured
    /// body is dropped because the HTML now leads.
    pub fn apply_to(&self, letter: &Letter) -> Letter {
        let html_changed = letter.content_html.as_deref().unwrap_or_default() != self.content_html;
        Letter {
            subject: Some(self.subject.clone()),
            content_html: Some(self.content_html.clone()),
            content_json: if html_changed { None } else { letter.content_json.clone() },
            salutation_override: self.salutation_override.clone(),
            closing_formula: self.closing_formula.clone(),
            closing_name: self.closing_name.clone(),
            closing_title: self.closing_title.clone(),
            show_pagination: self.show_pagination,
            ..letter.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_600_000 + secs, 0).unwrap()
    }

    fn draft(subject: &str) -> LetterDraft {
        LetterDraft {
            subject: subject.into(),
            ..Default::default()
        }
    }

    #[test]
    fn edit_then_save_cycle() {
        let s = EditorSession::new(draft("A"))
            .reduce(SessionEvent::LoadRemote {
                value: draft("B"),
                at: at(0),
            });
        assert_eq!(s.draft().subject, "B");
        assert!(!s.is_dirty());
        assert_eq!(s.last_synced_at(), Some(at(0)));

        let s = s.reduce(SessionEvent::EditLocal {
            value: draft("C"),
            at: at(5),
        });
        assert!(s.is_dirty());
        assert_eq!(s.preview().subject, "B");
        assert!(!s.needs_autosave(at(6), Duration::seconds(2)));
        assert!(s.needs_autosave(at(8), Duration::seconds(2)));

        let s = s.reduce(SessionEvent::ApplyDraftToPreview);
        assert_eq!(s.preview().subject, "C");

        let s = s.reduce(SessionEvent::AutosaveSucceeded {
            saved: draft("C"),
            at: at(9),
        });
        assert!(!s.is_dirty());
        assert!(!s.needs_autosave(at(20), Duration::seconds(2)));
        assert_eq!(s.last_synced_at(), Some(at(9)));
    }

    #[test]
    fn remote_reload_keeps_unsaved_draft() {
        let s = EditorSession::new(draft("A"))
            .reduce(SessionEvent::EditLocal {
                value: draft("mine"),
                at: at(1),
            })
            .reduce(SessionEvent::LoadRemote {
                value: draft("theirs"),
                at: at(2),
            });
        assert_eq!(s.draft().subject, "mine");
        assert_eq!(s.committed().subject, "theirs");
        assert!(s.is_dirty());
    }

    #[test]
    fn save_of_older_draft_leaves_newer_edits_dirty() {
        let s = EditorSession::new(draft("A"))
            .reduce(SessionEvent::EditLocal {
                value: draft("AB"),
                at: at(1),
            })
            .reduce(SessionEvent::EditLocal {
                value: draft("ABC"),
                at: at(2),
            })
            .reduce(SessionEvent::AutosaveSucceeded {
                saved: draft("AB"),
                at: at(3),
            });
        assert!(s.is_dirty());
    }

    #[test]
    fn draft_round_trips_through_letter() {
        let letter = Letter {
            subject: Some("Alt".into()),
            content_html: Some("<p>x</p>".into()),
            content_json: Some(serde_json::json!({"type": "doc"})),
            reference_number: Some("Az. 1".into()),
            ..Default::default()
        };
        let mut d = LetterDraft::from_letter(&letter);
        assert_eq!(d.subject, "Alt");

        let same = d.apply_to(&letter);
        assert!(same.content_json.is_some());

        d.content_html = "<p>neu</p>".into();
        let updated = d.apply_to(&letter);
        assert_eq!(updated.content_html.as_deref(), Some("<p>neu</p>"));
        assert!(updated.content_json.is_none());
        assert_eq!(updated.reference_number.as_deref(), Some("Az. 1"));
    }
}
