//! TrackerMirror port - 外部タスクトラッカー（Wrike）への best-effort ミラー
//!
//! # 設計原則
//! - 失敗は伝播しない（`None` / 空の Vec + ログ）
//! - folder 単位でタスクを作る
//! - mirror は正本ではない。削除時の後始末もしない

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{TaskPatch, TaskStatus, TrackerSettings};

/// Task as the tracker reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerTask {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub responsible_ids: Vec<String>,
    #[serde(default)]
    pub permalink: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerComment {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerContact {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Workflow status on the tracker side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStatus {
    Active,
    Completed,
}

impl TrackerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackerStatus::Active => "Active",
            TrackerStatus::Completed => "Completed",
        }
    }
}

impl From<TaskStatus> for TrackerStatus {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Completed => TrackerStatus::Completed,
            TaskStatus::Active | TaskStatus::InProgress => TrackerStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerTaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub responsibles: Vec<String>,
    pub due: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerTaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TrackerStatus>,
    pub due: Option<NaiveDate>,
}

impl TrackerTaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&TaskPatch> for TrackerTaskPatch {
    fn from(patch: &TaskPatch) -> Self {
        Self {
            title: patch.title.clone(),
            description: patch.description.clone(),
            status: patch.status.map(TrackerStatus::from),
            due: patch.due_date.as_ref().map(|due| due.day()),
        }
    }
}

#[async_trait]
pub trait TrackerMirror: Send + Sync {
    fn initialize(&self, settings: &TrackerSettings);

    /// Whether `token` is accepted by the tracker.
    async fn test_connection(&self, token: &str) -> bool;

    async fn create_task(&self, draft: &TrackerTaskDraft) -> Option<TrackerTask>;

    async fn update_task(&self, tracker_id: &str, patch: &TrackerTaskPatch) -> Option<TrackerTask>;

    async fn add_comment(&self, tracker_id: &str, text: &str) -> Option<TrackerComment>;

    /// Tasks in the configured folder.
    async fn list_tasks(&self) -> Vec<TrackerTask>;

    async fn list_contacts(&self) -> Vec<TrackerContact>;
}
