//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryGateway**: プロセス内の authoritative store（テスト・`--memory` 用）
//! - **PostgrestGateway**: Supabase REST 方言の authoritative store
//! - **WrikeClient**: tracker mirror
//! - **GoogleCalendarClient**: calendar mirror
//! - **GoogleChatClient**: chat webhook
//! - **FileSettingsStorage / MemorySettingsStorage**: 設定ブロブの保存先
//! - **StaticTokenConsent**: calendar の同意フロー（トークン直渡し）
//!
//! 外部呼び出しの失敗はここで `tracing` に記録し、port の契約
//! （`None` / `false` / 空）に変換します。

pub mod consent;
pub mod google_calendar;
pub mod google_chat;
pub mod memory;
pub mod postgrest;
pub mod settings_file;
pub mod wrike;

pub use self::consent::{StaticTokenConsent, consent_url};
pub use self::google_calendar::{CalendarError, GoogleCalendarClient};
pub use self::google_chat::{ChatError, GoogleChatClient};
pub use self::memory::InMemoryGateway;
pub use self::postgrest::PostgrestGateway;
pub use self::settings_file::{FileSettingsStorage, MemorySettingsStorage, SETTINGS_FILE_NAME};
pub use self::wrike::{TrackerError, WrikeClient};

use crate::domain::Collection;
use crate::ports::GatewayError;

/// Gateway boundary: keep the value, or log the error and drop it.
fn absorb<T>(
    target: &'static str,
    collection: Collection,
    op: &'static str,
    result: Result<T, GatewayError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(GatewayError::NotInitialized) => {
            tracing::debug!(backend = target, %collection, op, "backend call skipped; not initialized");
            None
        }
        Err(e) => {
            tracing::warn!(backend = target, %collection, op, error = %e, "backend call failed");
            None
        }
    }
}
