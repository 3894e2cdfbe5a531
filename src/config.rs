use crate::clock::Timezone;
use crate::errors::{AppError, AppResult};
use crate::models::DEFAULT_RETENTION_DAYS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DATA_DIR_ENV: &str = "KNOWLEDGE_HUB_DATA_DIR";
pub const TIMEZONE_ENV: &str = "KNOWLEDGE_HUB_TIMEZONE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// Seeds `retentionDays` of a freshly created archive document.
    pub retention_days: u32,
    pub timezone: Timezone,
    pub log_level: String,
    pub archive_page_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            retention_days: DEFAULT_RETENTION_DAYS,
            timezone: Timezone::Local,
            log_level: "info".to_string(),
            archive_page_limit: 50,
        }
    }
}

impl AppConfig {
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Reads `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(error) => return Err(AppError::Io(error.to_string())),
        };
        let config: Self = serde_json::from_str(&raw)
            .map_err(|error| AppError::Config(format!("{}: {}", path.display(), error)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(mut self) -> AppResult<Self> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(zone) = std::env::var(TIMEZONE_ENV) {
            self.timezone = Timezone::parse(&zone).ok_or_else(|| {
                AppError::Config(format!(
                    "{TIMEZONE_ENV} must be 'local' or 'utc', got '{zone}'"
                ))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.retention_days == 0 {
            return Err(AppError::Config("retentionDays must be at least 1".to_string()));
        }
        if self.archive_page_limit == 0 {
            return Err(AppError::Config("archivePageLimit must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let root = tempfile::tempdir().expect("temp root");
        let config = AppConfig::load(&root.path().join(CONFIG_FILE_NAME)).expect("defaults");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.retention_days, 30);
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let root = tempfile::tempdir().expect("temp root");
        let path = root.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{ "retentionDays": 7, "timezone": "utc" }"#).expect("write config");

        let config = AppConfig::load(&path).expect("config");
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.timezone, Timezone::Utc);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.archive_page_limit, 50);
    }

    #[test]
    fn malformed_or_invalid_file_is_config_error() {
        let root = tempfile::tempdir().expect("temp root");
        let path = root.path().join(CONFIG_FILE_NAME);

        fs::write(&path, "retentionDays = 7").expect("write config");
        assert_eq!(AppConfig::load(&path).expect_err("malformed").code(), "CONFIG_INVALID");

        fs::write(&path, r#"{ "retentionDays": 0 }"#).expect("write config");
        assert_eq!(AppConfig::load(&path).expect_err("zero retention").code(), "CONFIG_INVALID");
    }
}
