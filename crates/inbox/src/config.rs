//! Manager configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{NotificationError, Result};

/// Path of the streaming endpoint, relative to the site origin.
pub const STREAM_PATH: &str = "/ws/notifications/";

/// How new notifications reach the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// Fetch `?since=` on a fixed interval and when the page becomes visible.
    Polling {
        #[serde(default = "default_polling_interval_ms")]
        interval_ms: u64,
    },
    /// Persistent WebSocket with fixed-delay reconnection.
    Streaming {
        #[serde(default = "default_reconnect_interval_ms")]
        reconnect_interval_ms: u64,
    },
}

impl Default for AcquisitionMode {
    fn default() -> Self {
        Self::Polling {
            interval_ms: default_polling_interval_ms(),
        }
    }
}

impl AcquisitionMode {
    pub fn polling(interval: Duration) -> Self {
        Self::Polling {
            interval_ms: interval.as_millis() as u64,
        }
    }

    pub fn streaming(reconnect_interval: Duration) -> Self {
        Self::Streaming {
            reconnect_interval_ms: reconnect_interval.as_millis() as u64,
        }
    }

    /// Streaming with the default reconnect delay.
    pub fn default_streaming() -> Self {
        Self::Streaming {
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Polling { .. } => "polling",
            Self::Streaming { .. } => "streaming",
        }
    }
}

fn default_polling_interval_ms() -> u64 {
    30_000
}

fn default_reconnect_interval_ms() -> u64 {
    5_000
}

/// Popup display settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupConfig {
    /// Maximum popups on screen; the oldest is evicted first.
    #[serde(default = "default_max_popups")]
    pub max_popup_notifications: usize,
    /// Auto-dismiss delay.
    #[serde(default = "default_popup_duration_ms")]
    pub popup_duration_ms: u64,
}

fn default_max_popups() -> usize {
    3
}

fn default_popup_duration_ms() -> u64 {
    5_000
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            max_popup_notifications: default_max_popups(),
            popup_duration_ms: default_popup_duration_ms(),
        }
    }
}

impl PopupConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.popup_duration_ms)
    }

    /// Popup queue capacity; zero is rejected.
    pub fn capacity(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.max_popup_notifications).ok_or_else(|| {
            NotificationError::config("max_popup_notifications must be non-zero")
        })
    }
}

/// Settings for a [`NotificationManager`](crate::manager::NotificationManager).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Site origin, e.g. `https://app.example.com`.
    pub base_url: String,
    #[serde(default)]
    pub mode: AcquisitionMode,
    #[serde(default)]
    pub popup: PopupConfig,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
    /// Initial load fetches only unread notifications.
    #[serde(default)]
    pub unread_only: bool,
    /// Maximum records kept locally; `None` keeps everything.
    #[serde(default = "default_history_limit")]
    pub history_limit: Option<usize>,
    /// HTTP request timeout in seconds; 0 disables it.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Raw `Cookie` header (session and `csrftoken`).
    #[serde(default)]
    pub cookies: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_history_limit() -> Option<usize> {
    Some(500)
}

fn default_timeout() -> u64 {
    30
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            mode: AcquisitionMode::default(),
            popup: PopupConfig::default(),
            sound_enabled: true,
            vibration_enabled: true,
            unread_only: false,
            history_limit: default_history_limit(),
            request_timeout_secs: default_timeout(),
            cookies: None,
        }
    }
}

impl ManagerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: AcquisitionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Parsed site origin. Only `http` and `https` are accepted.
    pub fn base(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(NotificationError::config(format!(
                "base_url must be http or https, got {other}"
            ))),
        }
    }

    /// WebSocket endpoint: `wss` for an `https` origin, `ws` otherwise.
    pub fn stream_url(&self) -> Result<Url> {
        let base = self.base()?;
        let scheme = if base.scheme() == "https" { "wss" } else { "ws" };
        let mut url = base.join(STREAM_PATH)?;
        url.set_scheme(scheme)
            .map_err(|_| NotificationError::config(format!("cannot derive {scheme} URL")))?;
        Ok(url)
    }

    /// Check everything the manager relies on before it is spawned.
    pub fn validate(&self) -> Result<()> {
        self.base()?;
        self.popup.capacity()?;
        match self.mode {
            AcquisitionMode::Polling { interval_ms: 0 } => {
                Err(NotificationError::config("polling interval must be non-zero"))
            }
            AcquisitionMode::Streaming {
                reconnect_interval_ms: 0,
            } => Err(NotificationError::config(
                "reconnect interval must be non-zero",
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(
            config.mode,
            AcquisitionMode::Polling {
                interval_ms: 30_000
            }
        );
        assert_eq!(config.popup.max_popup_notifications, 3);
        assert_eq!(config.popup.duration(), Duration::from_secs(5));
        assert!(config.sound_enabled);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_stream_url_follows_origin_scheme() {
        let secure = ManagerConfig::new("https://app.example.com/dashboard/");
        assert_eq!(
            secure.stream_url().unwrap().as_str(),
            "wss://app.example.com/ws/notifications/"
        );

        let plain = ManagerConfig::new("http://localhost:8000");
        assert_eq!(
            plain.stream_url().unwrap().as_str(),
            "ws://localhost:8000/ws/notifications/"
        );
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(ManagerConfig::new("ftp://example.com").validate().is_err());
        assert!(ManagerConfig::new("not a url").validate().is_err());
        assert!(
            ManagerConfig::new("http://x")
                .with_mode(AcquisitionMode::Polling { interval_ms: 0 })
                .validate()
                .is_err()
        );
        assert!(ManagerConfig::new("http://x").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_popup_cap() {
        let mut config = ManagerConfig::new("http://x");
        config.popup.max_popup_notifications = 0;
        assert!(matches!(
            config.validate(),
            Err(NotificationError::Config(_))
        ));

        config.popup.max_popup_notifications = 1;
        assert_eq!(config.popup.capacity().unwrap().get(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{
            "base_url": "https://example.com",
            "mode": { "type": "streaming" },
            "popup": { "max_popup_notifications": 5 },
            "request_timeout_secs": 0
        }"#;
        let config: ManagerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.mode,
            AcquisitionMode::Streaming {
                reconnect_interval_ms: 5_000
            }
        );
        assert_eq!(config.popup.max_popup_notifications, 5);
        assert_eq!(config.popup.popup_duration_ms, 5_000);
        assert_eq!(config.history_limit, Some(500));
        assert_eq!(config.request_timeout(), None);
    }
}
