//! Manager commands and internal completion events.

use tokio::sync::oneshot;

use crate::api::{MarkAllReadResponse, MarkReadResponse, NotificationPage};
use crate::error::Result;
use crate::model::{NotificationId, NotificationListState};
use crate::popup::PopupHandle;
use crate::stream::ConnectionState;

/// Page visibility, as reported by the embedding UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// Commands sent to the manager task by a `ManagerHandle`.
#[derive(Debug)]
pub(crate) enum ManagerCommand {
    MarkRead(NotificationId),
    MarkAllRead,
    /// Popup clicked: mark read, dismiss, follow the action link.
    OpenPopup(NotificationId),
    /// Popup close button.
    DismissPopup(NotificationId),
    SetVisibility(Visibility),
    /// Full reload.
    Refresh,
    /// Poll now, or reconnect when streaming.
    CheckNow,
    Snapshot(oneshot::Sender<NotificationListState>),
    /// `None` in polling mode.
    ConnectionState(oneshot::Sender<Option<ConnectionState>>),
    Shutdown,
}

/// Completions posted back by tasks the manager spawned.
#[derive(Debug)]
pub(crate) enum ManagerEvent {
    /// Initial load or reload finished; `seq` orders overlapping reloads.
    Loaded {
        seq: u64,
        result: Result<NotificationPage>,
    },
    /// A `?since=` check finished.
    Polled(Result<NotificationPage>),
    MarkReadConfirmed {
        id: NotificationId,
        result: Result<MarkReadResponse>,
    },
    MarkAllReadConfirmed(Result<MarkAllReadResponse>),
    PopupExpired(PopupHandle),
}

/// Result of command handling - indicates whether to continue or stop.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CommandResult {
    Continue,
    Stop,
}
