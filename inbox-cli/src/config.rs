use std::fs;
use std::path::{Path, PathBuf};

use inbox::{AcquisitionMode, ManagerConfig, PopupConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};

const CONFIG_DIR: &str = "inbox";
const CONFIG_FILE: &str = "config.toml";

/// Persistent CLI settings (`<config dir>/inbox/config.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<String>,
    pub sound_enabled: bool,
    pub unread_only: bool,
    /// Records kept locally; 0 keeps everything.
    pub history_limit: usize,
    pub request_timeout_secs: u64,
    /// Colorize terminal output.
    pub colored: bool,
    pub mode: AcquisitionMode,
    pub popup: PopupConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let manager = ManagerConfig::default();
        Self {
            base_url: manager.base_url,
            cookies: None,
            sound_enabled: manager.sound_enabled,
            unread_only: manager.unread_only,
            history_limit: manager.history_limit.unwrap_or(0),
            request_timeout_secs: manager.request_timeout_secs,
            colored: true,
            mode: manager.mode,
            popup: manager.popup,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
            .ok_or_else(|| AppError::Config("no configuration directory on this platform".into()))
    }

    /// Load from `path` (or the default location); a missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Overwrite the file with defaults.
    pub fn reset(path: Option<&Path>) -> Result<()> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        Self::default().save(&path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// TOML rendering with cookie values hidden.
    pub fn show(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.cookies.is_some() {
            shown.cookies = Some("<hidden>".to_string());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }

    /// Command-line and environment values take precedence over the file.
    pub fn apply_overrides(&mut self, base_url: Option<String>, cookies: Option<String>) {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if cookies.is_some() {
            self.cookies = cookies;
        }
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            base_url: self.base_url.clone(),
            mode: self.mode,
            popup: self.popup,
            sound_enabled: self.sound_enabled,
            // A terminal cannot vibrate.
            vibration_enabled: false,
            unread_only: self.unread_only,
            history_limit: (self.history_limit > 0).then_some(self.history_limit),
            request_timeout_secs: self.request_timeout_secs,
            cookies: self.cookies.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
base_url = "https://app.example.com"
colored = false

[mode]
type = "streaming"
reconnect_interval_ms = 2000
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.base_url, "https://app.example.com");
        assert!(!config.colored);
        assert_eq!(config.mode, AcquisitionMode::streaming(Duration::from_secs(2)));
        assert_eq!(config.popup, PopupConfig::default());
    }

    #[test]
    fn test_reset_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        AppConfig::reset(Some(&path)).unwrap();
        assert_eq!(AppConfig::load(Some(&path)).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_unbounded_history_survives_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let defaults = AppConfig::default();
        assert_eq!(defaults.history_limit, 500);
        assert_eq!(defaults.manager_config().history_limit, Some(500));

        let config = AppConfig {
            history_limit: 0,
            ..AppConfig::default()
        };
        config.save(&path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("history_limit = 0"));

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.history_limit, 0);
        assert_eq!(loaded.manager_config().history_limit, None);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "base_url = [").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(AppError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_overrides_and_show() {
        let mut config = AppConfig::default();
        config.apply_overrides(None, Some("sessionid=secret".to_string()));
        assert_eq!(config.base_url, "http://localhost:8000");

        let shown = config.show().unwrap();
        assert!(!shown.contains("secret"));
        assert!(shown.contains("<hidden>"));

        let manager = config.manager_config();
        assert_eq!(manager.cookies.as_deref(), Some("sessionid=secret"));
        assert!(!manager.vibration_enabled);
    }
}
