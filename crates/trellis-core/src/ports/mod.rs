//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。各 trait は外部コラボレーター
//! （authoritative store, tracker, calendar, chat, 設定の保存先）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - authoritative store が source of truth（正本）
//! - tracker / calendar は best-effort の mirror
//! - 外部呼び出しの失敗はポートの境界で吸収する

pub mod calendar;
pub mod chat;
pub mod clock;
pub mod gateway;
pub mod id_generator;
pub mod settings_storage;
pub mod tracker;

pub use self::calendar::{
    AuthorizeError, CALENDAR_SCOPES, CalendarEvent, CalendarMirror, ConsentFlow, ConsentPrompt,
    ConsentRequest, EventDraft, EventPatch, EventTime, EventWindow,
};
pub use self::chat::{CardHeader, ChatMessage, ChatNotifier, TaskEvent};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::gateway::{
    BackendGateway, ChangeFeed, DEFAULT_BACKEND_HOST_SUFFIX, GatewayError, endpoint_matches,
};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::settings_storage::{SettingsError, SettingsStorage};
pub use self::tracker::{
    TrackerComment, TrackerContact, TrackerMirror, TrackerStatus, TrackerTask, TrackerTaskDraft,
    TrackerTaskPatch,
};
