//! Notification source: the server's JSON API.

mod http;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{NotificationId, NotificationRecord};

pub use http::{CSRF_COOKIE, HttpNotificationApi, install_rustls_provider, parse_cookie_header};

/// Body of `GET /api/notifications/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPage {
    pub notifications: Vec<NotificationRecord>,
    pub unread_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub has_more: bool,
}

/// Body of `POST /api/notifications/{id}/mark-read/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub success: bool,
    pub unread_count: u64,
}

/// Body of `POST /api/notifications/mark-all-read/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub success: bool,
    /// How many notifications the server flipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u64>,
}

/// Remote notification source.
///
/// Every method is a single request; callers decide what to do with failures.
#[async_trait]
pub trait NotificationApi: Send + Sync + 'static {
    /// Full list, optionally restricted to unread notifications.
    async fn list(&self, unread_only: bool) -> Result<NotificationPage>;

    /// Notifications newer than `since` (everything when `None`).
    async fn since(&self, since: Option<DateTime<Utc>>) -> Result<NotificationPage>;

    /// Persist the read flag for one notification.
    async fn mark_read(&self, id: &NotificationId) -> Result<MarkReadResponse>;

    /// Persist the read flag for every notification.
    async fn mark_all_read(&self) -> Result<MarkAllReadResponse>;
}

/// Cursor value for the `since` query parameter; empty before the first fetch.
pub fn format_since(since: Option<DateTime<Utc>>) -> String {
    since
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_since() {
        assert_eq!(format_since(None), "");
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(format_since(Some(t)), "2024-05-01T10:00:00.000Z");
    }

    #[test]
    fn test_page_with_extra_fields() {
        let json = r#"{
            "notifications": [],
            "total_count": 0,
            "unread_count": 2,
            "has_more": false
        }"#;
        let page: NotificationPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.unread_count, 2);
        assert_eq!(page.total_count, Some(0));
    }

    #[test]
    fn test_page_without_counter_is_malformed() {
        let json = r#"{ "notifications": [] }"#;
        assert!(serde_json::from_str::<NotificationPage>(json).is_err());
    }

    #[test]
    fn test_mark_read_without_counter_is_malformed() {
        let json = r#"{"success": true}"#;
        assert!(serde_json::from_str::<MarkReadResponse>(json).is_err());

        let body: MarkReadResponse =
            serde_json::from_str(r#"{"success": true, "unread_count": 4}"#).unwrap();
        assert_eq!(body.unread_count, 4);
    }

    #[test]
    fn test_mark_all_read_minimal_body() {
        let body: MarkAllReadResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(body.success);
        assert_eq!(body.unread_count, None);
    }
}
