//! ActivityEntry - 変更操作ごとに残る履歴（append-only）

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::Row;
use super::ids::ActivityId;

/// Number of activity entries kept in memory and fetched on load.
pub const ACTIVITY_RETENTION: usize = 20;

/// ActivitySource は操作の発生元
///
/// 旧データのラベル（`supabase` など）も読み込み時に受け付けます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    #[serde(alias = "supabase")]
    Backend,
    #[serde(alias = "wrike")]
    Tracker,
    #[serde(alias = "google_calendar")]
    Calendar,
    #[serde(alias = "google_chat")]
    Chat,
}

impl fmt::Display for ActivitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActivitySource::Backend => "backend",
            ActivitySource::Tracker => "tracker",
            ActivitySource::Calendar => "calendar",
            ActivitySource::Chat => "chat",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: ActivityId,
    pub action: String,
    pub source: ActivitySource,
    /// Opaque key-value payload (`taskId`, `noteId`, `delayId`, ...).
    #[serde(default)]
    pub details: Row,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityDraft {
    pub action: String,
    pub source: ActivitySource,
    pub details: Row,
    pub created_at: DateTime<Utc>,
}
