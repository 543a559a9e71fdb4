//! Settings - 4 つのコラボレーターの資格情報 + ユーザープロフィール
//!
//! 永続化ブロブの形そのもの。保存時・読み込み時に変換はしません。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub url: String,
    pub key: String,
}

impl BackendSettings {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        !self.url.is_empty() && !self.key.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub token: String,
    pub folder_id: String,
}

impl TrackerSettings {
    pub fn is_present(&self) -> bool {
        !self.token.is_empty() && !self.folder_id.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    pub client_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub webhook_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub tracker: TrackerSettings,
    pub calendar: CalendarSettings,
    pub chat: ChatSettings,
    pub user: UserProfile,
}

/// Top-level key of one settings section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Backend,
    Tracker,
    Calendar,
    Chat,
    User,
}

impl Section {
    pub fn key(self) -> &'static str {
        match self {
            Section::Backend => "backend",
            Section::Tracker => "tracker",
            Section::Calendar => "calendar",
            Section::Chat => "chat",
            Section::User => "user",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backend" => Ok(Section::Backend),
            "tracker" => Ok(Section::Tracker),
            "calendar" => Ok(Section::Calendar),
            "chat" => Ok(Section::Chat),
            "user" => Ok(Section::User),
            other => Err(format!("unknown settings section: {other}")),
        }
    }
}
