//! Notification records and the render model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque notification identifier (a UUID string on the server side).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NotificationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    /// Any level string this client does not know about.
    #[serde(other)]
    Other,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single notification as held in the local list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub level: NotificationLevel,
    #[serde(default = "default_unread")]
    pub unread: bool,
    pub created_at: DateTime<Utc>,
    /// Optional link followed when the notification is opened.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub action_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub action_text: Option<String>,
}

fn default_unread() -> bool {
    true
}

/// The server sends blank strings for unset optional text fields.
pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

impl NotificationRecord {
    /// Create an unread record with no action link.
    pub fn new(
        id: impl Into<NotificationId>,
        title: impl Into<String>,
        message: impl Into<String>,
        level: NotificationLevel,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: message.into(),
            level,
            unread: true,
            created_at,
            action_url: None,
            action_text: None,
        }
    }

    pub fn with_action(mut self, url: impl Into<String>, text: Option<String>) -> Self {
        self.action_url = Some(url.into());
        self.action_text = text;
        self
    }

    /// Label for the action link; "View" when the server gave none.
    pub fn action_label(&self) -> &str {
        self.action_text.as_deref().unwrap_or("View")
    }
}

/// Snapshot handed to the presentation sink.
///
/// `unread_count` is the server's figure and can disagree with the number of
/// unread records in `notifications` (e.g. when only a page was fetched).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationListState {
    /// Newest first.
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: u64,
}

impl NotificationListState {
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn get(&self, id: &NotificationId) -> Option<&NotificationRecord> {
        self.notifications.iter().find(|n| &n.id == id)
    }

    /// Unread records visible locally; not a substitute for `unread_count`.
    pub fn local_unread(&self) -> usize {
        self.notifications.iter().filter(|n| n.unread).count()
    }
}
