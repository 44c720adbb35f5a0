// src/config.rs
//! Calendar service configuration.
//!
//! Loaded from TOML (`config/calendar.toml` or `$CALENDAR_CONFIG_PATH`).
//! A missing file is not an error: every field has a default that matches the
//! production behaviour, so an empty config reproduces it exactly.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

// --- env defaults & names ---
pub const DEFAULT_CALENDAR_CONFIG_PATH: &str = "config/calendar.toml";
pub const ENV_CALENDAR_CONFIG_PATH: &str = "CALENDAR_CONFIG_PATH";
pub const ENV_SETTLE_DELAY_SECS: &str = "CALENDAR_SETTLE_DELAY_SECS";
pub const ENV_DATA_PATH: &str = "CALENDAR_DATA_PATH";

pub const DEFAULT_TARGET_URL: &str = "https://www.investing.com/economic-calendar/";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_DATA_PATH: &str = "data/economic_calendar.csv";

fn default_target_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}
fn default_navigation_timeout_secs() -> u64 {
    60
}
/// Flat wait after navigation for client-side rendering. There is no readiness
/// signal on the remote page, so this stays a plain delay.
fn default_settle_delay_secs() -> u64 {
    8
}
/// UTC-4, not adjusted for daylight saving.
fn default_utc_offset_minutes() -> i32 {
    -240
}
fn default_refresh_check_interval_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_target_url")]
    pub target_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// Period of the background coordinator tick; 0 disables the task.
    #[serde(default = "default_refresh_check_interval_secs")]
    pub refresh_check_interval_secs: u64,
    /// Explicit Chrome/Chromium binary; autodetected when absent.
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            target_url: default_target_url(),
            user_agent: default_user_agent(),
            data_path: default_data_path(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_delay_secs: default_settle_delay_secs(),
            utc_offset_minutes: default_utc_offset_minutes(),
            refresh_check_interval_secs: default_refresh_check_interval_secs(),
            chrome_executable: None,
        }
    }
}

impl CalendarConfig {
    /// Load using `$CALENDAR_CONFIG_PATH` or the default path, then apply env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(ENV_CALENDAR_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CALENDAR_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            tracing::info!(target: "calendar", path = %path.display(), "no calendar config file, using defaults");
            Self::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Some(secs) = parse_secs_env(std::env::var(ENV_SETTLE_DELAY_SECS).ok()) {
            self.settle_delay_secs = secs;
        }
        if let Ok(p) = std::env::var(ENV_DATA_PATH) {
            let p = p.trim();
            if !p.is_empty() {
                self.data_path = PathBuf::from(p);
            }
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn refresh_check_interval(&self) -> Option<Duration> {
        (self.refresh_check_interval_secs > 0)
            .then(|| Duration::from_secs(self.refresh_check_interval_secs))
    }
}

fn parse_secs_env(raw: Option<String>) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(target: "calendar", value = %raw, "ignoring invalid seconds value in env");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn empty_toml_yields_production_defaults() {
        let cfg: CalendarConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.navigation_timeout_secs, 60);
        assert_eq!(cfg.settle_delay_secs, 8);
        assert_eq!(cfg.utc_offset_minutes, -240);
        assert_eq!(cfg.data_path, PathBuf::from("data/economic_calendar.csv"));
        assert!(cfg.chrome_executable.is_none());
    }

    #[test]
    fn partial_toml_overrides_only_given_fields() {
        let cfg: CalendarConfig =
            toml::from_str("settle_delay_secs = 2\nrefresh_check_interval_secs = 0").unwrap();
        assert_eq!(cfg.settle_delay(), Duration::from_secs(2));
        assert_eq!(cfg.refresh_check_interval(), None);
        assert_eq!(cfg.target_url, DEFAULT_TARGET_URL);
    }

    #[test]
    fn invalid_env_seconds_are_ignored() {
        assert_eq!(parse_secs_env(Some(" 3 ".into())), Some(3));
        assert_eq!(parse_secs_env(Some("soon".into())), None);
        assert_eq!(parse_secs_env(None), None);
    }

    #[serial_test::serial]
    #[test]
    fn load_applies_env_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("calendar.toml");
        fs::write(&p, "settle_delay_secs = 5\n").unwrap();

        env::set_var(ENV_CALENDAR_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_SETTLE_DELAY_SECS, "1");
        env::set_var(ENV_DATA_PATH, "tmp/cal.csv");

        let cfg = CalendarConfig::load().unwrap();
        assert_eq!(cfg.settle_delay_secs, 1);
        assert_eq!(cfg.data_path, PathBuf::from("tmp/cal.csv"));

        env::remove_var(ENV_CALENDAR_CONFIG_PATH);
        env::remove_var(ENV_SETTLE_DELAY_SECS);
        env::remove_var(ENV_DATA_PATH);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[serial_test::serial]
    #[test]
    fn config_logs_pass_the_default_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let buf = Captured::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(
                crate::telemetry::DEFAULT_FILTER,
            ))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        env::set_var(ENV_CALENDAR_CONFIG_PATH, tmp.path().join("missing.toml"));
        tracing::subscriber::with_default(subscriber, || {
            CalendarConfig::load().unwrap();
        });
        env::remove_var(ENV_CALENDAR_CONFIG_PATH);

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("no calendar config file"), "log output: {out}");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("calendar.toml");
        fs::write(&p, "settle_delay_secs = \"eight\"").unwrap();
        let err = CalendarConfig::load_from_file(&p).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
