//! ActivityFeed - 変更操作ごとの履歴
//!
//! 書き込みは best-effort。失敗しても呼び出し元の操作は成功扱いのまま。
//! ローカルのリストは新しい順に上限件数（既定 20）だけ保持します。

use std::sync::Arc;

use crate::domain::{ActivityDraft, ActivityEntry, ActivitySource, Row};
use crate::ports::{BackendGateway, Clock};
use crate::typed::{Change, Subscription, Table};

use super::live::LiveList;

/// One-key details payload such as `{"taskId": "42"}`.
pub fn details(key: &str, id: impl ToString) -> Row {
    let mut row = Row::new();
    row.insert(key.to_string(), id.to_string().into());
    row
}

#[derive(Clone)]
pub struct ActivityFeed {
    table: Table<ActivityEntry>,
    list: LiveList<ActivityEntry>,
    clock: Arc<dyn Clock>,
    cap: usize,
}

impl ActivityFeed {
    pub fn new(gateway: Arc<dyn BackendGateway>, clock: Arc<dyn Clock>, cap: usize) -> Self {
        Self {
            table: Table::new(gateway),
            list: LiveList::capped(cap),
            clock,
            cap,
        }
    }

    pub fn list(&self) -> &LiveList<ActivityEntry> {
        &self.list
    }

    pub async fn load(&self) {
        self.list.replace(self.table.list(Some(self.cap)).await);
    }

    /// Append an entry; `None` when the backend refused it.
    pub async fn log(&self, action: impl Into<String>, source: ActivitySource, details: Row) -> Option<ActivityEntry> {
        let draft = ActivityDraft {
            action: action.into(),
            source,
            details,
            created_at: self.clock.now(),
        };
        let Some(entry) = self.table.create(&draft).await else {
            tracing::warn!(action = %draft.action, "activity entry was not recorded");
            return None;
        };
        self.list.apply(Change::Insert(entry.clone()));
        Some(entry)
    }

    /// Only inserts reach the list; the history is append-only.
    pub fn subscribe(&self) -> Option<Subscription> {
        let list = self.list.clone();
        self.table.subscribe(move |change| {
            if let Change::Insert(entry) = change {
                list.apply(Change::Insert(entry));
            }
        })
    }
}
