//! DashboardBuilder - コラボレーターのワイヤリング
//!
//! # Fail-fast 設計
//! - 4 つのコラボレーターと設定の保存先は必須
//! - `build()` 時に不足をまとめて `BuildError` で返す
//!
//! # 使用例
//! ```ignore
//! let dashboard = DashboardBuilder::from_config(&config, consent).build()?;
//! dashboard.start().await;
//! ```

use std::sync::Arc;

use crate::config::{AppConfig, DEFAULT_CHAT_CARD_SUBTITLE};
use crate::domain::{ACTIVITY_RETENTION, Collaborator};
use crate::impls::{
    FileSettingsStorage, GoogleCalendarClient, GoogleChatClient, PostgrestGateway, WrikeClient,
};
use crate::ports::{
    BackendGateway, CalendarMirror, ChatNotifier, Clock, ConsentFlow, SettingsStorage,
    SystemClock, TrackerMirror,
};

use super::activity::ActivityFeed;
use super::context::ServiceContext;
use super::credentials::CredentialStore;
use super::dashboard::Dashboard;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing collaborators: {0:?}. Each one needs an implementation before build().")]
    MissingCollaborators(Vec<Collaborator>),

    #[error("no settings storage was configured")]
    MissingSettingsStorage,
}

pub struct DashboardBuilder {
    gateway: Option<Arc<dyn BackendGateway>>,
    tracker: Option<Arc<dyn TrackerMirror>>,
    calendar: Option<Arc<dyn CalendarMirror>>,
    chat: Option<Arc<dyn ChatNotifier>>,
    settings: Option<Arc<dyn SettingsStorage>>,
    clock: Arc<dyn Clock>,
    activity_cap: usize,
    chat_subtitle: String,
}

impl Default for DashboardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardBuilder {
    pub fn new() -> Self {
        Self {
            gateway: None,
            tracker: None,
            calendar: None,
            chat: None,
            settings: None,
            clock: Arc::new(SystemClock),
            activity_cap: ACTIVITY_RETENTION,
            chat_subtitle: DEFAULT_CHAT_CARD_SUBTITLE.to_string(),
        }
    }

    /// Production wiring: HTTP adapters sharing one client, settings in a JSON file.
    pub fn from_config(config: &AppConfig, consent: Arc<dyn ConsentFlow>) -> Self {
        let http = config.http_client();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::new()
            .gateway(Arc::new(
                PostgrestGateway::new(http.clone()).with_host_suffix(&config.backend_host_suffix),
            ))
            .tracker(Arc::new(WrikeClient::with_api_base(
                http.clone(),
                &config.tracker_api_base,
            )))
            .calendar(Arc::new(
                GoogleCalendarClient::new(http.clone(), consent, Arc::clone(&clock))
                    .with_api_base(&config.calendar_api_base)
                    .with_time_zone(&config.calendar_time_zone),
            ))
            .chat(Arc::new(GoogleChatClient::new(http, Arc::clone(&clock))))
            .settings_storage(Arc::new(FileSettingsStorage::new(&config.settings_path)))
            .clock(clock)
            .activity_cap(config.activity_cap)
            .chat_subtitle(&config.chat_card_subtitle)
    }

    pub fn gateway(mut self, gateway: Arc<dyn BackendGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn tracker(mut self, tracker: Arc<dyn TrackerMirror>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn calendar(mut self, calendar: Arc<dyn CalendarMirror>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn chat(mut self, chat: Arc<dyn ChatNotifier>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn settings_storage(mut self, storage: Arc<dyn SettingsStorage>) -> Self {
        self.settings = Some(storage);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn activity_cap(mut self, cap: usize) -> Self {
        self.activity_cap = cap.max(1);
        self
    }

    pub fn chat_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.chat_subtitle = subtitle.into();
        self
    }

    /// Wire everything together; the saved settings are read here.
    pub fn build(self) -> Result<Dashboard, BuildError> {
        let missing: Vec<Collaborator> = [
            (Collaborator::Backend, self.gateway.is_some()),
            (Collaborator::Tracker, self.tracker.is_some()),
            (Collaborator::Calendar, self.calendar.is_some()),
            (Collaborator::Chat, self.chat.is_some()),
        ]
        .into_iter()
        .filter(|(_, present)| !present)
        .map(|(who, _)| who)
        .collect();

        let (Some(gateway), Some(tracker), Some(calendar), Some(chat)) =
            (self.gateway, self.tracker, self.calendar, self.chat)
        else {
            return Err(BuildError::MissingCollaborators(missing));
        };
        let storage = self.settings.ok_or(BuildError::MissingSettingsStorage)?;

        let activity = ActivityFeed::new(Arc::clone(&gateway), Arc::clone(&self.clock), self.activity_cap);
        let ctx = ServiceContext::new(
            gateway,
            tracker,
            calendar,
            chat,
            self.clock,
            CredentialStore::load(storage),
            self.chat_subtitle,
        );
        Ok(Dashboard::new(Arc::new(ctx), activity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Connectivity;
    use crate::impls::{InMemoryGateway, MemorySettingsStorage};
    use crate::testing::{RecordingCalendar, RecordingChat, RecordingTracker};

    #[test]
    fn build_reports_every_missing_collaborator() {
        let result = DashboardBuilder::new()
            .gateway(Arc::new(InMemoryGateway::connected()))
            .chat(Arc::new(RecordingChat::default()))
            .settings_storage(Arc::new(MemorySettingsStorage::new()))
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingCollaborators(missing))
                if missing == vec![Collaborator::Tracker, Collaborator::Calendar]
        ));
    }

    #[test]
    fn build_requires_settings_storage() {
        let result = DashboardBuilder::new()
            .gateway(Arc::new(InMemoryGateway::connected()))
            .tracker(Arc::new(RecordingTracker::default()))
            .calendar(Arc::new(RecordingCalendar::default()))
            .chat(Arc::new(RecordingChat::default()))
            .build();
        assert!(matches!(result, Err(BuildError::MissingSettingsStorage)));
    }

    #[test]
    fn build_succeeds_with_everything_wired() {
        let dashboard = DashboardBuilder::new()
            .gateway(Arc::new(InMemoryGateway::connected()))
            .tracker(Arc::new(RecordingTracker::default()))
            .calendar(Arc::new(RecordingCalendar::default()))
            .chat(Arc::new(RecordingChat::default()))
            .settings_storage(Arc::new(MemorySettingsStorage::new()))
            .build()
            .unwrap();
        assert_eq!(dashboard.connectivity(), Connectivity::default());
    }

    #[test]
    fn from_config_wires_http_adapters() {
        let consent = Arc::new(crate::impls::StaticTokenConsent::new("t"));
        let result = DashboardBuilder::from_config(&AppConfig::default(), consent).build();
        assert!(result.is_ok());
    }
}
