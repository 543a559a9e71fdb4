//! Delay - 遅延ログ（append-only、編集・削除なし）

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::DelayId;

/// Duration prefilled on a new delay entry.
pub const DEFAULT_DELAY_DURATION: &str = "1 day";

/// DelayCategory は固定 6 種類
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelayCategory {
    #[default]
    #[serde(rename = "Technical Issues")]
    TechnicalIssues,
    #[serde(rename = "Scope Change")]
    ScopeChange,
    #[serde(rename = "Resource Unavailable")]
    ResourceUnavailable,
    #[serde(rename = "External Dependency")]
    ExternalDependency,
    #[serde(rename = "Requirements Clarification")]
    RequirementsClarification,
    #[serde(rename = "Other")]
    Other,
}

impl DelayCategory {
    pub const ALL: [DelayCategory; 6] = [
        DelayCategory::TechnicalIssues,
        DelayCategory::ScopeChange,
        DelayCategory::ResourceUnavailable,
        DelayCategory::ExternalDependency,
        DelayCategory::RequirementsClarification,
        DelayCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DelayCategory::TechnicalIssues => "Technical Issues",
            DelayCategory::ScopeChange => "Scope Change",
            DelayCategory::ResourceUnavailable => "Resource Unavailable",
            DelayCategory::ExternalDependency => "External Dependency",
            DelayCategory::RequirementsClarification => "Requirements Clarification",
            DelayCategory::Other => "Other",
        }
    }
}

impl fmt::Display for DelayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DelayCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DelayCategory::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown delay category: {wanted}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delay {
    pub id: DelayId,
    /// Free text, not a foreign key.
    pub task_title: String,
    pub reason: String,
    pub category: DelayCategory,
    pub duration: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayDraft {
    pub task_title: String,
    pub reason: String,
    pub category: DelayCategory,
    pub duration: String,
}

impl DelayDraft {
    pub fn new(task_title: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            task_title: task_title.into(),
            reason: reason.into(),
            category: DelayCategory::default(),
            duration: DEFAULT_DELAY_DURATION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_serialize_with_labels() {
        for category in DelayCategory::ALL {
            let value = serde_json::to_value(category).unwrap();
            assert_eq!(value, serde_json::json!(category.label()));
            assert_eq!(category.label().parse::<DelayCategory>().unwrap(), category);
        }
    }

    #[test]
    fn new_draft_uses_form_defaults() {
        let draft = DelayDraft::new("Payroll export", "waiting on vendor");
        assert_eq!(draft.category, DelayCategory::TechnicalIssues);
        assert_eq!(draft.duration, DEFAULT_DELAY_DURATION);
    }
}
