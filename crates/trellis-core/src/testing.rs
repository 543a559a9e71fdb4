//! テスト用の fake と組み立て済みのダッシュボード
//!
//! mirror の fake は呼び出しを文字列で記録します（`initialize` と
//! `test_connection` は記録しない）。

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::app::{Dashboard, DashboardBuilder};
use crate::domain::{CalendarSettings, ChatSettings, TrackerSettings};
use crate::impls::{InMemoryGateway, MemorySettingsStorage};
use crate::ports::{
    AuthorizeError, CalendarEvent, CalendarMirror, ChatMessage, ChatNotifier, Clock, EventDraft,
    EventPatch, EventWindow, SystemClock, TrackerComment, TrackerContact, TrackerMirror,
    TrackerTask, TrackerTaskDraft, TrackerTaskPatch, UlidGenerator,
};

pub const SETTINGS_BLOB: &str = r#"{
    "backend": { "url": "https://test.supabase.co", "key": "anon" },
    "tracker": { "token": "tok", "folder_id": "F1" },
    "calendar": { "client_id": "cid.apps.googleusercontent.com" },
    "chat": { "webhook_url": "https://chat.googleapis.com/v1/spaces/S/messages" },
    "user": { "name": "Sam", "email": "sam@example.com" }
}"#;

/// Let spawned subscription tasks drain the change feed.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

fn record(log: &Mutex<Vec<String>>, call: String) {
    log.lock().unwrap().push(call);
}

pub struct RecordingTracker {
    calls: Mutex<Vec<String>>,
    reachable: AtomicBool,
    failing: AtomicBool,
    next_id: AtomicUsize,
}

impl Default for RecordingTracker {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reachable: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            next_id: AtomicUsize::new(1),
        }
    }
}

impl RecordingTracker {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Only `create_task` takes a fresh id (`WR1`, `WR2`, ...).
    fn next_task(&self, title: &str) -> TrackerTask {
        let id = format!("WR{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        Self::task(id, title)
    }

    fn task(id: impl Into<String>, title: &str) -> TrackerTask {
        TrackerTask {
            id: id.into(),
            title: title.to_string(),
            status: Some("Active".into()),
            description: None,
            responsible_ids: Vec::new(),
            permalink: None,
        }
    }
}

#[async_trait]
impl TrackerMirror for RecordingTracker {
    fn initialize(&self, _settings: &TrackerSettings) {}

    async fn test_connection(&self, _token: &str) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    async fn create_task(&self, draft: &TrackerTaskDraft) -> Option<TrackerTask> {
        record(&self.calls, format!("create_task:{}", draft.title));
        (!self.failing.load(Ordering::SeqCst)).then(|| self.next_task(&draft.title))
    }

    async fn update_task(&self, tracker_id: &str, patch: &TrackerTaskPatch) -> Option<TrackerTask> {
        let status = patch.status.map(|s| s.as_str()).unwrap_or("-");
        record(&self.calls, format!("update_task:{tracker_id}:{status}"));
        Some(Self::task(tracker_id, patch.title.as_deref().unwrap_or_default()))
    }

    async fn add_comment(&self, tracker_id: &str, text: &str) -> Option<TrackerComment> {
        record(&self.calls, format!("add_comment:{tracker_id}:{text}"));
        Some(TrackerComment {
            id: "C1".into(),
            text: text.to_string(),
        })
    }

    async fn list_tasks(&self) -> Vec<TrackerTask> {
        record(&self.calls, "list_tasks".into());
        vec![Self::task("WR-listed", "remote")]
    }

    async fn list_contacts(&self) -> Vec<TrackerContact> {
        record(&self.calls, "list_contacts".into());
        Vec::new()
    }
}

pub struct RecordingCalendar {
    calls: Mutex<Vec<String>>,
    reachable: AtomicBool,
    configured: AtomicBool,
}

impl Default for RecordingCalendar {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reachable: AtomicBool::new(true),
            configured: AtomicBool::new(false),
        }
    }
}

impl RecordingCalendar {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    fn event(id: &str, summary: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            summary: Some(summary.to_string()),
            description: None,
            start: None,
            end: None,
            html_link: None,
        }
    }
}

#[async_trait]
impl CalendarMirror for RecordingCalendar {
    fn initialize(&self, settings: &CalendarSettings) {
        self.configured
            .store(!settings.client_id.is_empty(), Ordering::SeqCst);
    }

    async fn authorize(&self) -> Result<(), AuthorizeError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AuthorizeError::Denied("user closed the consent screen".into()))
        }
    }

    /// Reachable once a client id has been handed over.
    async fn test_connection(&self) -> bool {
        self.reachable.load(Ordering::SeqCst) && self.configured.load(Ordering::SeqCst)
    }

    async fn create_event(&self, draft: &EventDraft) -> Option<CalendarEvent> {
        record(&self.calls, format!("create_event:{}", draft.summary));
        Some(Self::event("EV1", &draft.summary))
    }

    async fn update_event(&self, event_id: &str, patch: &EventPatch) -> Option<CalendarEvent> {
        record(&self.calls, format!("update_event:{event_id}"));
        Some(Self::event(event_id, patch.summary.as_deref().unwrap_or_default()))
    }

    async fn list_events(&self, _window: EventWindow) -> Vec<CalendarEvent> {
        record(&self.calls, "list_events".into());
        vec![Self::event("EV0", "standup")]
    }
}

#[derive(Default)]
pub struct RecordingChat {
    sent: Mutex<Vec<ChatMessage>>,
}

impl RecordingChat {
    pub fn sent(&self) -> Vec<ChatMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }
}

#[async_trait]
impl ChatNotifier for RecordingChat {
    fn initialize(&self, _settings: &ChatSettings) {}

    async fn test_connection(&self, webhook_url: &str) -> bool {
        crate::impls::google_chat::is_webhook_url(webhook_url)
    }

    async fn send(&self, message: &ChatMessage) -> Option<serde_json::Value> {
        self.sent.lock().unwrap().push(message.clone());
        Some(serde_json::json!({}))
    }
}

pub struct Harness {
    pub dashboard: Dashboard,
    pub gateway: Arc<InMemoryGateway>,
    pub tracker: Arc<RecordingTracker>,
    pub calendar: Arc<RecordingCalendar>,
    pub chat: Arc<RecordingChat>,
    pub storage: Arc<MemorySettingsStorage>,
}

impl Harness {
    /// Wired but not started; settings for every collaborator are saved.
    pub fn new() -> Self {
        Self::with_storage(MemorySettingsStorage::with_blob(SETTINGS_BLOB))
    }

    pub fn with_storage(storage: MemorySettingsStorage) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let gateway = Arc::new(InMemoryGateway::new(
            Arc::clone(&clock),
            Arc::new(UlidGenerator::new(Arc::clone(&clock))),
        ));
        let tracker = Arc::new(RecordingTracker::default());
        let calendar = Arc::new(RecordingCalendar::default());
        let chat = Arc::new(RecordingChat::default());
        let storage = Arc::new(storage);

        let dashboard = DashboardBuilder::new()
            .gateway(gateway.clone())
            .tracker(tracker.clone())
            .calendar(calendar.clone())
            .chat(chat.clone())
            .settings_storage(storage.clone())
            .clock(clock)
            .chat_subtitle("Payroll")
            .build()
            .unwrap();

        Self {
            dashboard,
            gateway,
            tracker,
            calendar,
            chat,
            storage,
        }
    }

    /// Started with everything connected and the mirror views loaded.
    pub async fn started() -> Self {
        let harness = Self::new();
        harness.dashboard.start().await;
        harness.forget_calls();
        harness
    }

    /// Drop what the fakes recorded so far (startup listing).
    pub fn forget_calls(&self) {
        self.tracker.calls.lock().unwrap().clear();
        self.calendar.calls.lock().unwrap().clear();
        self.chat.sent.lock().unwrap().clear();
    }
}
