//! Note - 自由記述のメモ行

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::NoteId;

/// Title stored when the user leaves it blank.
pub const UNTITLED_NOTE: &str = "Untitled Note";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    /// Tracker task that receives the content as a comment. Never persisted.
    #[serde(skip)]
    pub tracker_task_id: Option<String>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            tracker_task_id: None,
        }
    }

    pub fn with_tracker_task(mut self, tracker_task_id: impl Into<String>) -> Self {
        self.tracker_task_id = Some(tracker_task_id.into());
        self
    }

    /// Blank titles become [`UNTITLED_NOTE`].
    pub fn normalized(mut self) -> Self {
        if self.title.trim().is_empty() {
            self.title = UNTITLED_NOTE.to_string();
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_becomes_untitled() {
        let draft = NoteDraft::new("   ", "body").normalized();
        assert_eq!(draft.title, UNTITLED_NOTE);

        let draft = NoteDraft::new("Kickoff", "body").normalized();
        assert_eq!(draft.title, "Kickoff");
    }

    #[test]
    fn tracker_link_is_not_persisted() {
        let draft = NoteDraft::new("t", "c").with_tracker_task("IEAAB");
        let row = serde_json::to_value(&draft).unwrap();
        assert_eq!(row, serde_json::json!({ "title": "t", "content": "c" }));
    }
}
