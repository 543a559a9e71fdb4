//! Dashboard - 同期コアのランタイム
//!
//! 4 つのコレクションのリスト、mirror のスナップショット、push 購読をまとめて持ちます。
//!
//! # ライフサイクル
//! 1. `start()`: 設定のあるコラボレーターを初期化し、接続を確認してから読み込む
//! 2. backend が繋がっていれば tasks / notes / activity を購読する（delays は購読しない）
//! 3. `refresh_all()`: 接続を再確認して読み込み直す
//! 4. `shutdown()`: 購読を閉じる（Drop でも閉じる）

use std::sync::{Arc, Mutex};

use crate::domain::Connectivity;
use crate::ports::EventWindow;
use crate::typed::Subscription;

use super::activity::ActivityFeed;
use super::context::ServiceContext;
use super::delays::DelayLog;
use super::mirrors::MirrorViews;
use super::notes::NoteSync;
use super::tasks::TaskSync;

pub struct Dashboard {
    ctx: Arc<ServiceContext>,
    pub tasks: TaskSync,
    pub notes: NoteSync,
    pub delays: DelayLog,
    pub activity: ActivityFeed,
    pub mirrors: MirrorViews,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Dashboard {
    pub(crate) fn new(ctx: Arc<ServiceContext>, activity: ActivityFeed) -> Self {
        Self {
            tasks: TaskSync::new(Arc::clone(&ctx), activity.clone()),
            notes: NoteSync::new(Arc::clone(&ctx), activity.clone()),
            delays: DelayLog::new(Arc::clone(&ctx), activity.clone()),
            mirrors: MirrorViews::new(Arc::clone(&ctx)),
            activity,
            ctx,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &Arc<ServiceContext> {
        &self.ctx
    }

    pub fn connectivity(&self) -> Connectivity {
        self.ctx.connectivity()
    }

    pub async fn start(&self) -> Connectivity {
        self.ctx.initialize_from_settings();
        let connectivity = self.refresh_all().await;
        tracing::info!(?connectivity, "dashboard started");
        connectivity
    }

    /// Re-check connections, then reload whatever is connected.
    pub async fn refresh_all(&self) -> Connectivity {
        let connectivity = self.ctx.check_connections().await;
        if connectivity.backend {
            self.reload_backend().await;
            self.ensure_subscribed();
        } else {
            self.close_subscriptions();
        }
        if connectivity.tracker {
            self.mirrors.load_tracker_tasks().await;
        }
        if connectivity.calendar {
            self.mirrors.load_events(EventWindow::default()).await;
        }
        connectivity
    }

    pub async fn reload_backend(&self) {
        tokio::join!(
            self.tasks.load(),
            self.notes.load(),
            self.activity.load(),
            self.delays.load(),
        );
    }

    pub async fn connect_backend(&self, url: &str, key: &str) -> bool {
        let connected = self.ctx.connect_backend(url, key).await;
        if connected {
            self.reload_backend().await;
            self.resubscribe();
        }
        connected
    }

    pub async fn connect_tracker(&self, token: &str, folder_id: &str) -> bool {
        let connected = self.ctx.connect_tracker(token, folder_id).await;
        if connected {
            self.mirrors.load_tracker_tasks().await;
        }
        connected
    }

    pub async fn connect_calendar(&self, client_id: &str) -> bool {
        let connected = self.ctx.connect_calendar(client_id).await;
        if connected {
            self.mirrors.load_events(EventWindow::default()).await;
        }
        connected
    }

    pub async fn connect_chat(&self, webhook_url: &str) -> bool {
        self.ctx.connect_chat(webhook_url).await
    }

    pub fn is_subscribed(&self) -> bool {
        let subs = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        !subs.is_empty() && subs.iter().all(Subscription::is_active)
    }

    pub fn shutdown(&self) {
        self.close_subscriptions();
        tracing::info!("dashboard stopped");
    }

    fn ensure_subscribed(&self) {
        if !self.is_subscribed() {
            self.resubscribe();
        }
    }

    fn resubscribe(&self) {
        let fresh: Vec<Subscription> = [
            self.tasks.subscribe(),
            self.notes.subscribe(),
            self.activity.subscribe(),
        ]
        .into_iter()
        .flatten()
        .collect();
        let stale = std::mem::replace(
            &mut *self.subscriptions.lock().unwrap_or_else(|e| e.into_inner()),
            fresh,
        );
        for sub in &stale {
            sub.unsubscribe();
        }
    }

    fn close_subscriptions(&self) {
        let stale = std::mem::take(&mut *self.subscriptions.lock().unwrap_or_else(|e| e.into_inner()));
        for sub in &stale {
            sub.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{Collection, Row, RowChange, Section, TaskStatus};
    use crate::impls::MemorySettingsStorage;
    use crate::testing::{Harness, settle};

    fn row(value: serde_json::Value) -> Row {
        match value {
            serde_json::Value::Object(row) => row,
            other => panic!("not an object: {other}"),
        }
    }

    fn task_row(id: &str, title: &str) -> Row {
        row(json!({
            "id": id,
            "title": title,
            "status": "active",
            "created_at": "2025-06-01T00:00:00Z"
        }))
    }

    #[tokio::test]
    async fn start_connects_loads_and_subscribes() {
        let h = Harness::new();
        h.gateway.seed(Collection::Tasks, [task_row("t0", "Seeded")]);

        let connectivity = h.dashboard.start().await;

        assert_eq!(
            connectivity,
            Connectivity {
                backend: true,
                tracker: true,
                calendar: true,
                chat: true,
            }
        );
        assert!(h.dashboard.is_subscribed());
        assert_eq!(h.dashboard.tasks.list().snapshot()[0].title, "Seeded");
        assert_eq!(h.dashboard.mirrors.tracker_tasks().len(), 1);
        assert_eq!(h.dashboard.mirrors.events()[0].id, "EV0");
    }

    #[tokio::test]
    async fn foreign_changes_are_reconciled() {
        let h = Harness::started().await;

        h.gateway.inject(RowChange::insert(Collection::Tasks, task_row("t9", "Remote")));
        settle().await;
        assert_eq!(h.dashboard.tasks.list().snapshot()[0].title, "Remote");

        let mut done = task_row("t9", "Remote");
        done.insert("status".into(), json!("completed"));
        h.gateway.inject(RowChange::update(Collection::Tasks, done));
        settle().await;
        let tasks = h.dashboard.tasks.list().snapshot();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Completed);

        h.gateway
            .inject(RowChange::delete(Collection::Tasks, row(json!({ "id": "t9" }))));
        settle().await;
        assert!(h.dashboard.tasks.list().snapshot().is_empty());
    }

    #[tokio::test]
    async fn activity_keeps_only_the_newest_entries() {
        let h = Harness::started().await;
        for n in 0..25 {
            let entry = row(json!({
                "id": format!("a{n}"),
                "action": format!("Imported {n}"),
                "source": "backend",
                "details": {},
                "created_at": "2025-06-01T00:00:00Z"
            }));
            h.gateway.inject(RowChange::insert(Collection::Activity, entry));
        }
        settle().await;

        let entries = h.dashboard.activity.list().snapshot();
        assert_eq!(entries.len(), 20);
        assert_eq!(entries[0].action, "Imported 24");
        assert_eq!(entries[19].action, "Imported 5");
    }

    #[tokio::test]
    async fn activity_ignores_foreign_updates_and_deletes() {
        let h = Harness::started().await;
        let entry = h
            .dashboard
            .activity
            .log("Created task: x", crate::domain::ActivitySource::Backend, Row::new())
            .await
            .unwrap();

        h.gateway.inject(RowChange::delete(
            Collection::Activity,
            row(json!({ "id": entry.id.to_string() })),
        ));
        settle().await;
        assert_eq!(h.dashboard.activity.list().snapshot(), vec![entry]);
    }

    #[tokio::test]
    async fn without_settings_nothing_is_connected() {
        let h = Harness::with_storage(MemorySettingsStorage::new());
        let connectivity = h.dashboard.start().await;

        assert_eq!(connectivity, Connectivity::default());
        assert!(!h.dashboard.is_subscribed());
        assert!(h.tracker.calls().is_empty());
        assert!(h.calendar.calls().is_empty());
    }

    #[tokio::test]
    async fn losing_the_backend_closes_subscriptions() {
        let h = Harness::started().await;
        assert!(h.dashboard.is_subscribed());

        let mut gone = Row::new();
        gone.insert("url".into(), json!("https://example.com"));
        h.dashboard
            .context()
            .credentials
            .set(Section::Backend, gone)
            .unwrap();
        let connectivity = h.dashboard.refresh_all().await;

        assert!(!connectivity.backend);
        assert!(!h.dashboard.is_subscribed());
    }

    #[tokio::test]
    async fn connect_backend_persists_and_subscribes() {
        let h = Harness::with_storage(MemorySettingsStorage::new());
        h.dashboard.start().await;

        assert!(!h.dashboard.connect_backend("https://example.com", "k").await);
        assert!(h.storage.blob().is_none());

        assert!(h.dashboard.connect_backend("https://proj.supabase.co", "anon").await);
        assert!(h.dashboard.connectivity().backend);
        assert!(h.dashboard.is_subscribed());
        let saved = h.storage.blob().unwrap();
        assert!(saved.contains("https://proj.supabase.co"));
    }

    #[tokio::test]
    async fn unsaved_credentials_still_connect() {
        let h = Harness::with_storage(MemorySettingsStorage::new());
        h.dashboard.start().await;
        h.storage.fail_saves(true);

        assert!(h.dashboard.connect_backend("https://proj.supabase.co", "anon").await);
        assert!(h.dashboard.connect_tracker("tok", "F1").await);

        let connectivity = h.dashboard.connectivity();
        assert!(connectivity.backend);
        assert!(connectivity.tracker);
        assert!(h.dashboard.is_subscribed());
        assert_eq!(h.dashboard.context().settings().tracker.token, "tok");
        assert!(h.storage.blob().is_none());
    }

    #[tokio::test]
    async fn connect_mirrors_load_their_views() {
        let h = Harness::with_storage(MemorySettingsStorage::new());
        h.dashboard.start().await;

        assert!(h.dashboard.connect_tracker("tok", "F1").await);
        assert_eq!(h.tracker.calls(), vec!["list_tasks"]);
        assert_eq!(h.dashboard.mirrors.tracker_tasks().len(), 1);

        assert!(h.dashboard.connect_calendar("cid").await);
        assert_eq!(h.calendar.calls(), vec!["list_events"]);

        assert!(!h.dashboard.connect_chat("https://example.com/hook").await);
        assert!(!h.dashboard.connectivity().chat);
        assert!(
            h.dashboard
                .connect_chat("https://chat.googleapis.com/v1/spaces/S/messages")
                .await
        );
        assert!(h.dashboard.connectivity().chat);
        assert!(!h.dashboard.connectivity().backend);
    }

    #[tokio::test]
    async fn refused_consent_keeps_calendar_disconnected() {
        let h = Harness::with_storage(MemorySettingsStorage::new());
        h.calendar.set_reachable(false);
        h.dashboard.start().await;

        assert!(!h.dashboard.connect_calendar("cid").await);
        assert!(!h.dashboard.connectivity().calendar);
        assert_eq!(h.dashboard.context().settings().calendar.client_id, "cid");
        assert!(h.calendar.calls().is_empty());
    }

    #[tokio::test]
    async fn shutdown_stops_push_delivery() {
        let h = Harness::started().await;
        h.dashboard.shutdown();
        assert!(!h.dashboard.is_subscribed());

        h.gateway.inject(RowChange::insert(Collection::Tasks, task_row("t9", "Late")));
        settle().await;
        assert!(h.dashboard.tasks.list().snapshot().is_empty());
    }
}
