//! Task - ダッシュボードのタスク行
//!
//! `wrike_id` / `calendar_event_id` は mirror との linkage 専用の列で、
//! 参照整合性は持ちません。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TaskId;

/// TaskStatus はタスクの状態
///
/// 遷移に制約はありません（any → any）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Active,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Two-state toggle: `completed` goes back to `active`, everything else completes.
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Completed => TaskStatus::Active,
            TaskStatus::Active | TaskStatus::InProgress => TaskStatus::Completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TaskStatus::Active),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// DueDate は日付のみ（`YYYY-MM-DD`）または RFC 3339 の日時
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DueDate {
    Day(NaiveDate),
    At(DateTime<FixedOffset>),
}

impl DueDate {
    /// The calendar day of the due date (tracker `dates.due` only takes days).
    pub fn day(&self) -> NaiveDate {
        match self {
            DueDate::Day(day) => *day,
            DueDate::At(at) => at.date_naive(),
        }
    }
}

impl FromStr for DueDate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(DueDate::Day(day));
        }
        DateTime::parse_from_rfc3339(s)
            .map(DueDate::At)
            .map_err(|e| format!("invalid due date {s:?}: {e}"))
    }
}

impl TryFrom<String> for DueDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DueDate> for String {
    fn from(value: DueDate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueDate::Day(day) => write!(f, "{}", day.format("%Y-%m-%d")),
            DueDate::At(at) => f.write_str(&at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<DueDate>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Tracker (Wrike) linkage.
    #[serde(default, rename = "wrike_id", skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the user when creating a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
    pub status: TaskStatus,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update; `None` fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(rename = "wrike_id", skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_event_id: Option<String>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn link_tracker(tracker_id: impl Into<String>) -> Self {
        Self {
            tracker_id: Some(tracker_id.into()),
            ..Self::default()
        }
    }

    pub fn link_calendar(event_id: impl Into<String>) -> Self {
        Self {
            calendar_event_id: Some(event_id.into()),
            ..Self::default()
        }
    }

    /// Whether the patch changes anything the calendar event shows.
    pub fn touches_schedule(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.due_date.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TaskStatus::Active, TaskStatus::Completed)]
    #[case(TaskStatus::InProgress, TaskStatus::Completed)]
    #[case(TaskStatus::Completed, TaskStatus::Active)]
    fn toggle_is_two_state(#[case] from: TaskStatus, #[case] to: TaskStatus) {
        assert_eq!(from.toggled(), to);
    }

    #[rstest]
    #[case(TaskStatus::Active)]
    #[case(TaskStatus::Completed)]
    fn double_toggle_restores_status(#[case] status: TaskStatus) {
        assert_eq!(status.toggled().toggled(), status);
    }

    #[test]
    fn in_progress_does_not_come_back() {
        let once = TaskStatus::InProgress.toggled();
        assert_eq!(once, TaskStatus::Completed);
        assert_eq!(once.toggled(), TaskStatus::Active);
    }

    #[test]
    fn due_date_accepts_day_and_timestamp() {
        let day: DueDate = "2025-03-14".parse().unwrap();
        assert_eq!(day.to_string(), "2025-03-14");

        let at: DueDate = "2025-03-14T09:30:00+10:30".parse().unwrap();
        assert_eq!(at.day(), NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());

        assert!("next tuesday".parse::<DueDate>().is_err());
    }

    #[test]
    fn task_reads_backend_row_with_nulls() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": 12,
            "title": "Draft award rules",
            "description": null,
            "assignee": "sam",
            "due_date": "2025-04-01",
            "status": "in_progress",
            "wrike_id": "IEAAB",
            "calendar_event_id": null,
            "created_at": "2025-03-01T10:00:00.123456+00:00"
        }))
        .unwrap();

        assert_eq!(task.id.as_str(), "12");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.tracker_id.as_deref(), Some("IEAAB"));
        assert!(task.calendar_event_id.is_none());
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = TaskPatch::link_tracker("IEAAB");
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "wrike_id": "IEAAB" })
        );
        assert!(!patch.touches_schedule());
        assert!(TaskPatch::default().is_empty());
    }
}
