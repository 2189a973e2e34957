use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

use crate::posture::{PostureConfig, SessionConfig};

pub const SETTINGS_PATH_VAR: &str = "SEATWATCH_SETTINGS";
pub const DB_PATH_VAR: &str = "SEATWATCH_DB";
pub const PORT_VAR: &str = "PORT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: u16,
    pub db_path: PathBuf,
    pub flush_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub history_window_hours: i64,
    /// Oldest entries beyond this count are trimmed after each append
    pub max_log_entries: Option<u64>,
    /// Offset applied when rendering bucket times as "HH:MM"
    pub display_utc_offset_minutes: i32,
    pub session: SessionConfig,
    pub posture: PostureConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: PathBuf::from("seatwatch.sqlite3"),
            flush_interval_secs: 60,
            heartbeat_interval_secs: 5,
            history_window_hours: 24,
            max_log_entries: Some(50_000),
            display_utc_offset_minutes: 0,
            session: SessionConfig::default(),
            posture: PostureConfig::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`, falling back to defaults when the file is absent.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    /// Settings for the running process: the JSON file named by `SEATWATCH_SETTINGS`
    /// (or `seatwatch.json`), then `SEATWATCH_DB` and `PORT` from the environment.
    pub fn load() -> Result<Self> {
        let path = env::var_os(SETTINGS_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("seatwatch.json"));
        let mut settings = Self::from_file(&path)?;
        settings.apply_overrides(env::var(DB_PATH_VAR).ok(), env::var(PORT_VAR).ok())?;
        Ok(settings)
    }

    fn apply_overrides(&mut self, db_path: Option<String>, port: Option<String>) -> Result<()> {
        if let Some(db_path) = db_path.filter(|value| !value.is_empty()) {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(port) = port.filter(|value| !value.is_empty()) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("{PORT_VAR} must be a port number, got {port:?}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let settings = Settings::from_file(Path::new("/nonexistent/seatwatch.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.session.prolonged_minutes, 2);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let settings: Settings = serde_json::from_str(
            r#"{ "flush_interval_secs": 10, "session": { "warn_minutes": 30 } }"#,
        )
        .unwrap();

        assert_eq!(settings.flush_interval_secs, 10);
        assert_eq!(settings.session.warn_minutes, Some(30));
        assert_eq!(settings.session.prolonged_minutes, 2);
        assert_eq!(settings.heartbeat_interval_secs, 5);
        assert_eq!(settings.posture, PostureConfig::default());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(Some("/tmp/seat.db".into()), Some("9000".into()))
            .unwrap();
        assert_eq!(settings.db_path, PathBuf::from("/tmp/seat.db"));
        assert_eq!(settings.port, 9000);

        assert!(settings.apply_overrides(None, Some("eighty".into())).is_err());
    }

    #[test]
    fn reads_file_from_disk() {
        let path = env::temp_dir().join(format!("seatwatch-settings-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, r#"{ "port": 3001, "max_log_entries": null }"#).unwrap();

        let settings = Settings::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(settings.port, 3001);
        assert_eq!(settings.max_log_entries, None);
    }
}
