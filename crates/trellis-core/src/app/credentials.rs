//! CredentialStore - 4 つのコラボレーターの資格情報とユーザープロフィール
//!
//! # 設計原則
//! - `set` はセクション内のキー単位でマージする（セクションを丸ごと置き換えない）
//! - 変更のたびに永続化する
//! - 壊れた保存データは致命的ではない（既定値 + 警告ログ）

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::domain::{Row, Section, Settings};
use crate::ports::{SettingsError, SettingsStorage};

pub struct CredentialStore {
    storage: Arc<dyn SettingsStorage>,
    settings: RwLock<Settings>,
}

impl CredentialStore {
    /// Read the saved blob; absent or unreadable storage yields defaults.
    pub fn load(storage: Arc<dyn SettingsStorage>) -> Self {
        let settings = match storage.load() {
            Ok(Some(blob)) => serde_json::from_str::<Settings>(&blob).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "saved settings are corrupt; using defaults");
                Settings::default()
            }),
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::warn!(error = %e, "settings could not be read; using defaults");
                Settings::default()
            }
        };
        Self {
            storage,
            settings: RwLock::new(settings),
        }
    }

    pub fn get(&self) -> Settings {
        self.settings.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Merge `partial` into one section by key, then persist.
    ///
    /// Keys the section does not know are ignored. A value of the wrong type leaves
    /// the settings untouched.
    pub fn set(&self, section: Section, partial: Row) -> Result<Settings, SettingsError> {
        let merged = {
            let mut current = self.settings.write().unwrap_or_else(|e| e.into_inner());
            let merged = merge_section(&current, section, partial)?;
            *current = merged.clone();
            merged
        };
        tracing::debug!(%section, "settings section updated");
        self.persist()?;
        Ok(merged)
    }

    /// Replace every key of `section` with the fields of `value`.
    pub fn set_section<T: Serialize>(&self, section: Section, value: &T) -> Result<Settings, SettingsError> {
        match serde_json::to_value(value)? {
            serde_json::Value::Object(partial) => self.set(section, partial),
            _ => Err(SettingsError::NotAnObject {
                section: section.to_string(),
            }),
        }
    }

    /// Write the current settings verbatim.
    pub fn persist(&self) -> Result<(), SettingsError> {
        let blob = serde_json::to_string_pretty(&self.get())?;
        self.storage.save(&blob).inspect_err(|e| {
            tracing::warn!(error = %e, "settings could not be saved");
        })
    }
}

fn merge_section(current: &Settings, section: Section, partial: Row) -> Result<Settings, SettingsError> {
    let mut whole = serde_json::to_value(current)?;
    let target = whole
        .get_mut(section.key())
        .and_then(serde_json::Value::as_object_mut)
        .ok_or_else(|| SettingsError::NotAnObject {
            section: section.to_string(),
        })?;
    for (key, value) in partial {
        if target.contains_key(&key) {
            target.insert(key, value);
        }
    }
    Ok(serde_json::from_value(whole)?)
}
