//! SettingsStorage port - 設定ブロブの永続化先
//!
//! 1 つの既知のキーに 1 つの JSON ブロブを保存します。
//! 中身の解釈は `app::credentials::CredentialStore` の責務。

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings io at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings section {section} must be a JSON object")]
    NotAnObject { section: String },
}

pub trait SettingsStorage: Send + Sync {
    /// Stored blob, `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<String>, SettingsError>;

    fn save(&self, blob: &str) -> Result<(), SettingsError>;
}
