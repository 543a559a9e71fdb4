//! Connectivity - 外部コラボレーターごとの接続フラグ
//!
//! 永続化しません。起動時と手動リフレッシュ時に再計算します。

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    Backend,
    Tracker,
    Calendar,
    Chat,
}

impl Collaborator {
    pub const ALL: [Collaborator; 4] = [
        Collaborator::Backend,
        Collaborator::Tracker,
        Collaborator::Calendar,
        Collaborator::Chat,
    ];
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Collaborator::Backend => "backend",
            Collaborator::Tracker => "tracker",
            Collaborator::Calendar => "calendar",
            Collaborator::Chat => "chat",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Connectivity {
    pub backend: bool,
    pub tracker: bool,
    pub calendar: bool,
    pub chat: bool,
}

impl Connectivity {
    pub fn get(&self, who: Collaborator) -> bool {
        match who {
            Collaborator::Backend => self.backend,
            Collaborator::Tracker => self.tracker,
            Collaborator::Calendar => self.calendar,
            Collaborator::Chat => self.chat,
        }
    }

    pub fn set(&mut self, who: Collaborator, connected: bool) {
        match who {
            Collaborator::Backend => self.backend = connected,
            Collaborator::Tracker => self.tracker = connected,
            Collaborator::Calendar => self.calendar = connected,
            Collaborator::Chat => self.chat = connected,
        }
    }
}
