//! TaskSync - タスクの同期コア
//!
//! 1 つのユーザー操作 = authoritative write 1 回 + best-effort の mirror 書き込み 0 回以上。
//!
//! # 手順（add / edit 共通）
//! 1. authoritative write。`None` ならそこで終わり（履歴も mirror も無し、リストも不変）
//! 2. 履歴を 1 件追加
//! 3. tracker / calendar / chat をそれぞれ接続フラグで判定して呼ぶ。結果は成否に影響しない
//! 4. tracker / calendar の作成に成功したら linkage 列を書き戻す（失敗しても再試行しない）

use std::sync::Arc;

use crate::domain::{
    ActivitySource, Collaborator, Task, TaskDraft, TaskId, TaskPatch, TaskStatus,
};
use crate::ports::{ChatMessage, EventDraft, EventPatch, TaskEvent, TrackerTaskDraft, TrackerTaskPatch};
use crate::typed::{Change, Subscription, Table};

use super::activity::{ActivityFeed, details};
use super::context::ServiceContext;
use super::live::LiveList;

/// Per-call opt-outs for mirror creation on add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOptions {
    pub tracker: bool,
    pub calendar: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            tracker: true,
            calendar: true,
        }
    }
}

#[derive(Clone)]
pub struct TaskSync {
    ctx: Arc<ServiceContext>,
    table: Table<Task>,
    list: LiveList<Task>,
    activity: ActivityFeed,
}

impl TaskSync {
    pub fn new(ctx: Arc<ServiceContext>, activity: ActivityFeed) -> Self {
        Self {
            table: Table::new(Arc::clone(&ctx.gateway)),
            list: LiveList::new(),
            ctx,
            activity,
        }
    }

    pub fn list(&self) -> &LiveList<Task> {
        &self.list
    }

    pub async fn load(&self) {
        self.list.replace(self.table.list(None).await);
    }

    pub fn subscribe(&self) -> Option<Subscription> {
        let list = self.list.clone();
        self.table.subscribe(move |change| {
            list.apply(change);
        })
    }

    pub async fn add(&self, draft: TaskDraft, options: AddOptions) -> Option<Task> {
        let mut task = self.table.create(&draft).await?;
        let id = task.id.clone();
        self.list.apply(Change::Insert(task.clone()));
        self.activity
            .log(
                format!("Created task: {}", task.title),
                ActivitySource::Backend,
                details("taskId", &task.id),
            )
            .await;

        if options.tracker && self.ctx.is_connected(Collaborator::Tracker) {
            let remote = TrackerTaskDraft {
                title: task.title.clone(),
                description: task.description.clone(),
                responsibles: Vec::new(),
                due: task.due_date.as_ref().map(|due| due.day()),
            };
            if let Some(remote) = self.ctx.tracker.create_task(&remote).await {
                let linked = self.link(&id, TaskPatch::link_tracker(remote.id)).await;
                task = linked.unwrap_or(task);
            }
        }

        if options.calendar
            && self.ctx.is_connected(Collaborator::Calendar)
            && let Some(event) = EventDraft::for_task(&task)
            && let Some(event) = self.ctx.calendar.create_event(&event).await
        {
            let linked = self.link(&id, TaskPatch::link_calendar(event.id)).await;
            task = linked.unwrap_or(task);
        }

        self.notify(TaskEvent::Created, &task.title, task.assignee.as_deref())
            .await;
        Some(task)
    }

    /// Update fields; `sync_tracker = false` keeps the change out of the tracker.
    pub async fn edit(&self, id: &TaskId, patch: TaskPatch, sync_tracker: bool) -> Option<Task> {
        let task = self.table.update(id, &patch).await?;
        self.list.apply(Change::Update(task.clone()));
        self.activity
            .log(
                format!("Updated task: {}", task.title),
                ActivitySource::Backend,
                details("taskId", &task.id),
            )
            .await;

        if sync_tracker
            && self.ctx.is_connected(Collaborator::Tracker)
            && let Some(tracker_id) = &task.tracker_id
        {
            let remote = TrackerTaskPatch::from(&patch);
            if !remote.is_empty() {
                self.ctx.tracker.update_task(tracker_id, &remote).await;
            }
        }

        if patch.touches_schedule()
            && self.ctx.is_connected(Collaborator::Calendar)
            && let Some(event_id) = &task.calendar_event_id
        {
            self.ctx
                .calendar
                .update_event(event_id, &EventPatch::for_task(&task))
                .await;
        }

        self.notify(TaskEvent::Updated, &task.title, None).await;
        Some(task)
    }

    /// Delete from the backend only. Linked tracker tasks and calendar events stay.
    pub async fn remove(&self, id: &TaskId) -> bool {
        let known = self.list.find(|t| &t.id == id);
        if !self.table.delete(id).await {
            return false;
        }
        self.list.apply(Change::Delete(id.clone()));

        let title = known.map(|t| t.title).unwrap_or_else(|| id.to_string());
        self.activity
            .log(
                format!("Deleted task: {title}"),
                ActivitySource::Backend,
                details("taskId", id),
            )
            .await;
        self.notify(TaskEvent::Deleted, &title, None).await;
        true
    }

    /// Flip between completed and active through the edit path.
    ///
    /// `None` when the task is not in the local list or the update failed.
    pub async fn toggle(&self, id: &TaskId) -> Option<Task> {
        let task = self.list.find(|t| &t.id == id)?;
        let next = task.status.toggled();
        let updated = self.edit(id, TaskPatch::status(next), true).await?;
        if next == TaskStatus::Completed {
            self.notify(TaskEvent::Completed, &task.title, None).await;
        }
        Some(updated)
    }

    async fn link(&self, id: &TaskId, patch: TaskPatch) -> Option<Task> {
        let Some(linked) = self.table.update(id, &patch).await else {
            tracing::warn!(task_id = %id, "mirror linkage was not written back");
            return None;
        };
        self.list.apply(Change::Update(linked.clone()));
        Some(linked)
    }

    async fn notify(&self, event: TaskEvent, title: &str, assignee: Option<&str>) {
        if !self.ctx.is_connected(Collaborator::Chat) {
            return;
        }
        let message = ChatMessage::task(event, title, assignee, &self.ctx.chat_subtitle);
        self.ctx.chat.send(&message).await;
    }
}
