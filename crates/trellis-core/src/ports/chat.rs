//! ChatNotifier port - チームチャットの incoming webhook
//!
//! fire-and-forget。HTTP の成功以外に確認応答の契約はありません。

use std::fmt;

use async_trait::async_trait;

use crate::domain::{ChatSettings, DelayCategory};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardHeader {
    pub title: String,
    pub subtitle: String,
}

/// Plain text, optionally wrapped in a card with a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: String,
    pub card: Option<CardHeader>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Created,
    Updated,
    Completed,
    Deleted,
}

impl TaskEvent {
    fn emoji(self) -> &'static str {
        match self {
            TaskEvent::Created => "✅",
            TaskEvent::Updated => "📝",
            TaskEvent::Completed => "🎉",
            TaskEvent::Deleted => "🗑️",
        }
    }

    fn title(self) -> &'static str {
        match self {
            TaskEvent::Created => "Task Created",
            TaskEvent::Updated => "Task Updated",
            TaskEvent::Completed => "Task Completed",
            TaskEvent::Deleted => "Task Deleted",
        }
    }
}

impl fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskEvent::Created => "created",
            TaskEvent::Updated => "updated",
            TaskEvent::Completed => "completed",
            TaskEvent::Deleted => "deleted",
        };
        f.write_str(label)
    }
}

impl ChatMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            card: None,
        }
    }

    pub fn task(event: TaskEvent, title: &str, assignee: Option<&str>, subtitle: &str) -> Self {
        let mut text = format!("{} *Task {event}*: {title}", event.emoji());
        if let Some(assignee) = assignee.filter(|a| !a.is_empty()) {
            text.push_str(&format!("\n👤 Assigned to: {assignee}"));
        }
        Self {
            text,
            card: Some(CardHeader {
                title: event.title().to_string(),
                subtitle: subtitle.to_string(),
            }),
        }
    }

    pub fn delay(
        task_title: &str,
        reason: &str,
        category: DelayCategory,
        duration: &str,
        subtitle: &str,
    ) -> Self {
        let text = format!(
            "⚠️ *Delay Logged*\n📋 Task: {task_title}\n📂 Category: {category}\n⏱️ Duration: {duration}\n💬 Reason: {reason}"
        );
        Self {
            text,
            card: Some(CardHeader {
                title: "Delay Alert".to_string(),
                subtitle: subtitle.to_string(),
            }),
        }
    }
}

#[async_trait]
pub trait ChatNotifier: Send + Sync {
    fn initialize(&self, settings: &ChatSettings);

    /// Validates the webhook url without sending anything.
    async fn test_connection(&self, webhook_url: &str) -> bool;

    /// Response body on HTTP success, `None` otherwise.
    async fn send(&self, message: &ChatMessage) -> Option<serde_json::Value>;
}
