//! ServiceContext - コラボレーターのハンドルと接続フラグを 1 か所に持つ
//!
//! グローバル状態は使わず、`DashboardBuilder` が 1 度だけ組み立てて
//! `Arc` で各同期コンポーネントに配ります。
//!
//! # 接続フラグ
//! - 永続化しない。起動時と `check_connections()` で再計算
//! - mirror への書き込みは対応するフラグが立っているときだけ行う

use std::sync::{Arc, Mutex};

use crate::domain::{
    BackendSettings, CalendarSettings, ChatSettings, Collaborator, Connectivity, Section, Settings,
    TrackerSettings,
};
use serde::Serialize;

use crate::ports::{BackendGateway, CalendarMirror, ChatNotifier, Clock, TrackerMirror};

use super::credentials::CredentialStore;

pub struct ServiceContext {
    pub gateway: Arc<dyn BackendGateway>,
    pub tracker: Arc<dyn TrackerMirror>,
    pub calendar: Arc<dyn CalendarMirror>,
    pub chat: Arc<dyn ChatNotifier>,
    pub clock: Arc<dyn Clock>,
    pub credentials: CredentialStore,
    /// Subtitle on chat notification cards.
    pub chat_subtitle: String,
    connectivity: Mutex<Connectivity>,
}

impl ServiceContext {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        tracker: Arc<dyn TrackerMirror>,
        calendar: Arc<dyn CalendarMirror>,
        chat: Arc<dyn ChatNotifier>,
        clock: Arc<dyn Clock>,
        credentials: CredentialStore,
        chat_subtitle: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            tracker,
            calendar,
            chat,
            clock,
            credentials,
            chat_subtitle: chat_subtitle.into(),
            connectivity: Mutex::new(Connectivity::default()),
        }
    }

    pub fn connectivity(&self) -> Connectivity {
        *self.connectivity.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_connected(&self, who: Collaborator) -> bool {
        self.connectivity().get(who)
    }

    fn mark(&self, who: Collaborator, connected: bool) {
        self.connectivity
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .set(who, connected);
    }

    pub fn settings(&self) -> Settings {
        self.credentials.get()
    }

    /// Hand every collaborator whose settings are present its credentials.
    pub fn initialize_from_settings(&self) {
        let settings = self.credentials.get();
        if settings.backend.is_present() {
            self.gateway.initialize(&settings.backend);
        }
        if settings.tracker.is_present() {
            self.tracker.initialize(&settings.tracker);
        }
        if !settings.calendar.client_id.is_empty() {
            self.calendar.initialize(&settings.calendar);
        }
        if !settings.chat.webhook_url.is_empty() {
            self.chat.initialize(&settings.chat);
        }
    }

    /// Recompute all four flags from the current settings.
    pub async fn check_connections(&self) -> Connectivity {
        let settings = self.credentials.get();
        let backend = settings.backend.is_present()
            && self.gateway.test_connection(&settings.backend).await;
        let tracker = !settings.tracker.token.is_empty()
            && self.tracker.test_connection(&settings.tracker.token).await;
        let calendar = self.calendar.test_connection().await;
        let chat = !settings.chat.webhook_url.is_empty()
            && self.chat.test_connection(&settings.chat.webhook_url).await;

        let checked = Connectivity {
            backend,
            tracker,
            calendar,
            chat,
        };
        *self.connectivity.lock().unwrap_or_else(|e| e.into_inner()) = checked;
        tracing::info!(backend, tracker, calendar, chat, "connections checked");
        checked
    }

    /// Test, then initialize and store the backend credentials.
    pub async fn connect_backend(&self, url: &str, key: &str) -> bool {
        let credentials = BackendSettings::new(url, key);
        if !self.gateway.test_connection(&credentials).await {
            tracing::info!(url, "backend credentials rejected");
            return false;
        }
        self.gateway.initialize(&credentials);
        self.mark(Collaborator::Backend, true);
        self.remember(Section::Backend, &credentials);
        true
    }

    pub async fn connect_tracker(&self, token: &str, folder_id: &str) -> bool {
        if !self.tracker.test_connection(token).await {
            tracing::info!("tracker token rejected");
            return false;
        }
        let settings = TrackerSettings {
            token: token.to_string(),
            folder_id: folder_id.to_string(),
        };
        self.tracker.initialize(&settings);
        self.mark(Collaborator::Tracker, true);
        self.remember(Section::Tracker, &settings);
        true
    }

    /// Store the client id and run the consent flow; connected iff consent succeeds.
    pub async fn connect_calendar(&self, client_id: &str) -> bool {
        let settings = CalendarSettings {
            client_id: client_id.to_string(),
        };
        self.calendar.initialize(&settings);
        self.remember(Section::Calendar, &settings);
        match self.calendar.authorize().await {
            Ok(()) => {
                self.mark(Collaborator::Calendar, true);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "calendar authorization failed");
                false
            }
        }
    }

    pub async fn connect_chat(&self, webhook_url: &str) -> bool {
        if !self.chat.test_connection(webhook_url).await {
            tracing::info!("chat webhook url rejected");
            return false;
        }
        let settings = ChatSettings {
            webhook_url: webhook_url.to_string(),
        };
        self.chat.initialize(&settings);
        self.mark(Collaborator::Chat, true);
        self.remember(Section::Chat, &settings);
        true
    }

    /// Store a section; a failed write keeps the in-memory value and is only logged.
    fn remember<T: Serialize>(&self, section: Section, value: &T) {
        if let Err(e) = self.credentials.set_section(section, value) {
            tracing::warn!(%section, error = %e, "credentials were not persisted");
        }
    }
}
