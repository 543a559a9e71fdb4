//! CalendarMirror port - カレンダー（Google Calendar の primary）への best-effort ミラー
//!
//! OAuth のアクセストークンが無い間は全ての呼び出しが `None` / `false` / 空を返します。
//! `authorize()` は設定管理からだけ呼ばれる対話的なステップで、
//! 同期コアの通常動作では使いません。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CalendarSettings, DueDate, Task};

/// Scopes requested by the consent flow.
pub const CALENDAR_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/calendar.events",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<EventTime>,
    #[serde(default)]
    pub end: Option<EventTime>,
    #[serde(default)]
    pub html_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub summary: String,
    pub description: Option<String>,
    pub start: DueDate,
    /// Defaults to one hour after `start`.
    pub end: Option<DueDate>,
    pub attendees: Vec<String>,
}

impl EventDraft {
    /// Event mirroring a task's due date; `None` when the task has no due date.
    pub fn for_task(task: &Task) -> Option<Self> {
        let start = task.due_date.clone()?;
        Some(Self {
            summary: task.title.clone(),
            description: task.description.clone(),
            start,
            end: None,
            attendees: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: Option<DueDate>,
}

impl EventPatch {
    /// Patch carrying the task's current title, description and due date.
    pub fn for_task(task: &Task) -> Self {
        Self {
            summary: Some(task.title.clone()),
            description: task.description.clone(),
            start: task.due_date.clone(),
        }
    }
}

/// Listing window; both ends default (now .. now + 30 days) when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EventWindow {
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
}

/// Whether the consent screen is forced or skipped when a grant already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentPrompt {
    Consent,
    Silent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsentRequest {
    pub client_id: String,
    pub scopes: Vec<String>,
    pub prompt: ConsentPrompt,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthorizeError {
    #[error("calendar client is not initialized")]
    NotInitialized,

    #[error("consent was not granted: {0}")]
    Denied(String),

    #[error("consent flow failed: {0}")]
    Flow(String),
}

/// ConsentFlow はユーザー同意画面を開いてアクセストークンを得る
///
/// ブラウザの implicit grant に相当する部分。CLI では URL を表示して
/// トークンを貼り付けてもらう実装になります。
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn request_token(&self, request: &ConsentRequest) -> Result<String, AuthorizeError>;
}

#[async_trait]
pub trait CalendarMirror: Send + Sync {
    fn initialize(&self, settings: &CalendarSettings);

    /// Interactive consent; on success later calls carry the access token.
    async fn authorize(&self) -> Result<(), AuthorizeError>;

    async fn test_connection(&self) -> bool;

    async fn create_event(&self, draft: &EventDraft) -> Option<CalendarEvent>;

    async fn update_event(&self, event_id: &str, patch: &EventPatch) -> Option<CalendarEvent>;

    async fn list_events(&self, window: EventWindow) -> Vec<CalendarEvent>;
}
