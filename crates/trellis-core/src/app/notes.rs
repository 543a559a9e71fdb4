//! NoteSync - メモの同期
//!
//! メモは chat に通知しません。tracker とは、作成時に `tracker_task_id` が
//! 指定されていればそのタスクへコメントとして本文を送るだけの関係です。

use std::sync::Arc;

use crate::domain::{ActivitySource, Collaborator, Note, NoteDraft, NoteId, NotePatch};
use crate::typed::{Change, Subscription, Table};

use super::activity::{ActivityFeed, details};
use super::context::ServiceContext;
use super::live::LiveList;

#[derive(Clone)]
pub struct NoteSync {
    ctx: Arc<ServiceContext>,
    table: Table<Note>,
    list: LiveList<Note>,
    activity: ActivityFeed,
}

impl NoteSync {
    pub fn new(ctx: Arc<ServiceContext>, activity: ActivityFeed) -> Self {
        Self {
            table: Table::new(Arc::clone(&ctx.gateway)),
            list: LiveList::new(),
            ctx,
            activity,
        }
    }

    pub fn list(&self) -> &LiveList<Note> {
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

    pub async fn add(&self, draft: NoteDraft) -> Option<Note> {
        let draft = draft.normalized();
        let note = self.table.create(&draft).await?;
        self.list.apply(Change::Insert(note.clone()));
        self.activity
            .log(
                format!("Created note: {}", note.title),
                ActivitySource::Backend,
                details("noteId", &note.id),
            )
            .await;

        if let Some(tracker_task_id) = &draft.tracker_task_id
            && self.ctx.is_connected(Collaborator::Tracker)
        {
            self.ctx
                .tracker
                .add_comment(tracker_task_id, &note.content)
                .await;
        }
        Some(note)
    }

    pub async fn edit(&self, id: &NoteId, patch: NotePatch) -> Option<Note> {
        let note = self.table.update(id, &patch).await?;
        self.list.apply(Change::Update(note.clone()));
        self.activity
            .log(
                format!("Updated note: {}", note.title),
                ActivitySource::Backend,
                details("noteId", &note.id),
            )
            .await;
        Some(note)
    }

    pub async fn remove(&self, id: &NoteId) -> bool {
        let known = self.list.find(|n| &n.id == id);
        if !self.table.delete(id).await {
            return false;
        }
        self.list.apply(Change::Delete(id.clone()));
        let title = known.map(|n| n.title).unwrap_or_else(|| id.to_string());
        self.activity
            .log(
                format!("Deleted note: {title}"),
                ActivitySource::Backend,
                details("noteId", id),
            )
            .await;
        true
    }
}
