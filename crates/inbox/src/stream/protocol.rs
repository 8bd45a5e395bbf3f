//! JSON frames exchanged over the notification WebSocket.
//!
//! Inbound frames are objects discriminated by `type` (and, for
//! `notification`, by `action`). Unknown discriminators decode to
//! [`InboundFrame::Unknown`] so callers can skip them without treating them as
//! errors; frames with a known discriminator but a bad shape are errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NotificationError, Result};
use crate::model::{NotificationId, NotificationLevel, NotificationRecord, blank_as_none};

/// A decoded server push.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// A new notification; always unread.
    Created(NotificationRecord),
    /// A notification was read elsewhere (another client or tab).
    Read(NotificationId),
    /// The server's current unread total.
    UnreadCount(u64),
    /// A frame this client does not handle.
    Unknown(String),
}

#[derive(Debug, Deserialize)]
struct CreatedPayload {
    id: NotificationId,
    title: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    level: NotificationLevel,
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "blank_as_none")]
    action_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    action_text: Option<String>,
}

impl From<CreatedPayload> for NotificationRecord {
    fn from(p: CreatedPayload) -> Self {
        Self {
            id: p.id,
            title: p.title,
            message: p.message,
            level: p.level,
            unread: true,
            created_at: p.created_at.unwrap_or_else(Utc::now),
            action_url: p.action_url,
            action_text: p.action_text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReadPayload {
    id: NotificationId,
}

#[derive(Debug, Deserialize)]
struct UnreadCountPayload {
    count: u64,
}

/// Decode one text frame.
pub fn decode_frame(text: &str) -> Result<InboundFrame> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| NotificationError::payload("frame has no type"))?
        .to_string();

    match kind.as_str() {
        "notification" => {
            let action = value
                .get("action")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            match action.as_str() {
                "created" => {
                    let payload: CreatedPayload = serde_json::from_value(value)?;
                    Ok(InboundFrame::Created(payload.into()))
                }
                "read" => {
                    let payload: ReadPayload = serde_json::from_value(value)?;
                    Ok(InboundFrame::Read(payload.id))
                }
                _ => Ok(InboundFrame::Unknown(format!("notification/{action}"))),
            }
        }
        "unread_count" => {
            let payload: UnreadCountPayload = serde_json::from_value(value)?;
            Ok(InboundFrame::UnreadCount(payload.count))
        }
        _ => Ok(InboundFrame::Unknown(kind)),
    }
}

/// Client-to-server frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    MarkRead { id: NotificationId },
    MarkAllRead,
}

impl OutboundFrame {
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| NotificationError::protocol(e.to_string()))
    }
}
