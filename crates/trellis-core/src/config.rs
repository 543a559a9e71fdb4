//! AppConfig - 環境変数から読む実行時設定
//!
//! 資格情報（settings.json）とは別物で、こちらはデプロイ単位の調整値です。
//! 解釈できない値は黙って既定値に戻します。

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::ACTIVITY_RETENTION;
use crate::impls::SETTINGS_FILE_NAME;
use crate::impls::google_calendar::{DEFAULT_CALENDAR_API_BASE, DEFAULT_CALENDAR_TIME_ZONE};
use crate::impls::wrike::DEFAULT_TRACKER_API_BASE;
use crate::ports::DEFAULT_BACKEND_HOST_SUFFIX;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CHAT_CARD_SUBTITLE: &str = "Project Dashboard";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub settings_path: PathBuf,
    pub log_json: bool,
    pub http_timeout: Duration,
    pub backend_host_suffix: String,
    pub tracker_api_base: String,
    pub calendar_api_base: String,
    pub calendar_time_zone: String,
    pub chat_card_subtitle: String,
    pub activity_cap: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from(SETTINGS_FILE_NAME),
            log_json: false,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            backend_host_suffix: DEFAULT_BACKEND_HOST_SUFFIX.to_string(),
            tracker_api_base: DEFAULT_TRACKER_API_BASE.to_string(),
            calendar_api_base: DEFAULT_CALENDAR_API_BASE.to_string(),
            calendar_time_zone: DEFAULT_CALENDAR_TIME_ZONE.to_string(),
            chat_card_subtitle: DEFAULT_CHAT_CARD_SUBTITLE.to_string(),
            activity_cap: ACTIVITY_RETENTION,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |name: &str, default: String| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };
        let timeout_secs = lookup("TRELLIS_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        let activity_cap = lookup("TRELLIS_ACTIVITY_CAP")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|cap| *cap > 0)
            .unwrap_or(defaults.activity_cap);

        Self {
            settings_path: lookup("TRELLIS_SETTINGS_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.settings_path),
            log_json: parse_bool(lookup("TRELLIS_LOG_JSON").as_deref()).unwrap_or(defaults.log_json),
            http_timeout: Duration::from_secs(timeout_secs),
            backend_host_suffix: text("TRELLIS_BACKEND_HOST_SUFFIX", defaults.backend_host_suffix),
            tracker_api_base: text("TRELLIS_TRACKER_API_BASE", defaults.tracker_api_base),
            calendar_api_base: text("TRELLIS_CALENDAR_API_BASE", defaults.calendar_api_base),
            calendar_time_zone: text("TRELLIS_CALENDAR_TIME_ZONE", defaults.calendar_time_zone),
            chat_card_subtitle: text("TRELLIS_CHAT_CARD_SUBTITLE", defaults.chat_card_subtitle),
            activity_cap,
        }
    }

    /// Shared HTTP client for every outbound adapter.
    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "http client builder failed; using defaults");
                reqwest::Client::new()
            })
    }
}

fn parse_bool(value: Option<&str>) -> Option<bool> {
    match value?.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config(&[]), AppConfig::default());
    }

    #[rstest]
    #[case("yes", true)]
    #[case("1", true)]
    #[case("FALSE", false)]
    #[case("maybe", false)]
    fn log_json_flag(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(config(&[("TRELLIS_LOG_JSON", raw)]).log_json, expected);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config(&[
            ("TRELLIS_SETTINGS_PATH", "/tmp/trellis/settings.json"),
            ("TRELLIS_HTTP_TIMEOUT_SECS", "3"),
            ("TRELLIS_BACKEND_HOST_SUFFIX", "internal.test"),
            ("TRELLIS_CALENDAR_TIME_ZONE", "UTC"),
            ("TRELLIS_ACTIVITY_CAP", "50"),
        ]);
        assert_eq!(cfg.settings_path, PathBuf::from("/tmp/trellis/settings.json"));
        assert_eq!(cfg.http_timeout, Duration::from_secs(3));
        assert_eq!(cfg.backend_host_suffix, "internal.test");
        assert_eq!(cfg.calendar_time_zone, "UTC");
        assert_eq!(cfg.activity_cap, 50);
    }

    #[test]
    fn nonsense_numbers_fall_back() {
        let cfg = config(&[("TRELLIS_HTTP_TIMEOUT_SECS", "0"), ("TRELLIS_ACTIVITY_CAP", "many")]);
        assert_eq!(cfg.http_timeout, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        assert_eq!(cfg.activity_cap, ACTIVITY_RETENTION);
    }
}
