//! SettingsStorage の実装
//!
//! - **FileSettingsStorage**: `settings.json` 1 ファイルに保存
//! - **MemorySettingsStorage**: テスト用

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ports::{SettingsError, SettingsStorage};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone)]
pub struct FileSettingsStorage {
    path: PathBuf,
}

impl FileSettingsStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/settings.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStorage for FileSettingsStorage {
    fn load(&self) -> Result<Option<String>, SettingsError> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io(e)),
        }
    }

    fn save(&self, blob: &str) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io(e))?;
        }
        // 書きかけのファイルを残さないよう、隣に書いてから rename する
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, blob).map_err(|e| self.io(e))?;
        fs::rename(&staging, &self.path).map_err(|e| self.io(e))
    }
}

#[derive(Debug, Default)]
pub struct MemorySettingsStorage {
    blob: Mutex<Option<String>>,
    failing: AtomicBool,
}

impl MemorySettingsStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every save fail (or succeed again).
    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn blob(&self) -> Option<String> {
        self.blob.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SettingsStorage for MemorySettingsStorage {
    fn load(&self) -> Result<Option<String>, SettingsError> {
        Ok(self.blob())
    }

    fn save(&self, blob: &str) -> Result<(), SettingsError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SettingsError::Io {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::other("saves are failing"),
            });
        }
        *self.blob.lock().unwrap_or_else(|e| e.into_inner()) = Some(blob.to_string());
        Ok(())
    }
}
