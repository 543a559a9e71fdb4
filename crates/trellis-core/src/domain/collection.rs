use std::fmt;

use serde::{Deserialize, Serialize};

/// The four record collections of the authoritative store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Tasks,
    Notes,
    Activity,
    Delays,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Tasks,
        Collection::Notes,
        Collection::Activity,
        Collection::Delays,
    ];

    /// Table name in the backend.
    pub fn table(self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::Notes => "notes",
            Collection::Activity => "activity",
            Collection::Delays => "delays",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}
