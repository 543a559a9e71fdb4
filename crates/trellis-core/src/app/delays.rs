//! DelayLog - 遅延ログ（作成のみ）
//!
//! push 購読はしません。自分の作成結果だけを先頭に積みます。

use std::sync::Arc;

use crate::domain::{ActivitySource, Collaborator, Delay, DelayDraft};
use crate::ports::ChatMessage;
use crate::typed::{Change, Table};

use super::activity::{ActivityFeed, details};
use super::context::ServiceContext;
use super::live::LiveList;

#[derive(Clone)]
pub struct DelayLog {
    ctx: Arc<ServiceContext>,
    table: Table<Delay>,
    list: LiveList<Delay>,
    activity: ActivityFeed,
}

impl DelayLog {
    pub fn new(ctx: Arc<ServiceContext>, activity: ActivityFeed) -> Self {
        Self {
            table: Table::new(Arc::clone(&ctx.gateway)),
            list: LiveList::new(),
            ctx,
            activity,
        }
    }

    pub fn list(&self) -> &LiveList<Delay> {
        &self.list
    }

    pub async fn load(&self) {
        self.list.replace(self.table.list(None).await);
    }

    pub async fn add(&self, draft: DelayDraft) -> Option<Delay> {
        let delay = self.table.create(&draft).await?;
        self.list.apply(Change::Insert(delay.clone()));
        self.activity
            .log(
                format!("Logged delay: {}", draft.reason),
                ActivitySource::Backend,
                details("delayId", &delay.id),
            )
            .await;

        if self.ctx.is_connected(Collaborator::Chat) {
            let message = ChatMessage::delay(
                &draft.task_title,
                &draft.reason,
                draft.category,
                &draft.duration,
                &self.ctx.chat_subtitle,
            );
            self.ctx.chat.send(&message).await;
        }
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Collection, DelayCategory};
    use crate::testing::{Harness, settle};

    fn draft(reason: &str) -> DelayDraft {
        DelayDraft {
            category: DelayCategory::ExternalDependency,
            duration: "2 days".into(),
            ..DelayDraft::new("Payroll export", reason)
        }
    }

    #[tokio::test]
    async fn new_delay_is_prepended_and_announced() {
        let h = Harness::started().await;
        let first = h.dashboard.delays.add(draft("vendor outage")).await.unwrap();
        let second = h.dashboard.delays.add(draft("missing data")).await.unwrap();

        assert_eq!(h.dashboard.delays.list().snapshot(), vec![second, first]);
        let sent = h.chat.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].text.contains("💬 Reason: vendor outage"));
        assert_eq!(sent[0].card.as_ref().unwrap().subtitle, "Payroll");

        let latest = &h.dashboard.activity.list().snapshot()[0];
        assert_eq!(latest.action, "Logged delay: missing data");
    }

    #[tokio::test]
    async fn delays_are_not_subscribed() {
        let h = Harness::started().await;
        let row = serde_json::json!({
            "id": "d-remote",
            "task_title": "Other team",
            "reason": "holiday",
            "category": "Other",
            "duration": "1 day",
            "created_at": "2025-06-01T00:00:00Z"
        });
        let serde_json::Value::Object(row) = row else { unreachable!() };
        h.gateway.inject(crate::domain::RowChange::insert(Collection::Delays, row));
        settle().await;

        assert!(h.dashboard.delays.list().snapshot().is_empty());
        h.dashboard.delays.load().await;
        assert_eq!(h.dashboard.delays.list().snapshot().len(), 1);
    }

    #[tokio::test]
    async fn failed_create_sends_nothing() {
        let h = Harness::started().await;
        h.gateway.fail_writes(Collection::Delays, true);

        assert!(h.dashboard.delays.add(draft("vendor outage")).await.is_none());
        assert!(h.chat.sent().is_empty());
        assert!(h.dashboard.delays.list().snapshot().is_empty());
    }
}
