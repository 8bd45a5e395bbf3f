//! Cloneable front end for a running manager.

use tokio::sync::{mpsc, oneshot};

use crate::error::{NotificationError, Result};
use crate::model::{NotificationId, NotificationListState};
use crate::stream::ConnectionState;

use super::events::{ManagerCommand, Visibility};

/// Sends user actions to the manager task.
///
/// Every method only enqueues a command; the outcome shows up through the
/// presentation sink. Methods fail with [`NotificationError::Closed`] once the
/// manager has stopped.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    tx: mpsc::Sender<ManagerCommand>,
}

impl ManagerHandle {
    pub(crate) fn new(tx: mpsc::Sender<ManagerCommand>) -> Self {
        Self { tx }
    }

    /// Mark one notification read, locally first, then on the server.
    ///
    /// An empty id is rejected without reaching the manager.
    pub async fn mark_as_read(&self, id: impl Into<NotificationId>) -> Result<()> {
        let id = id.into();
        if id.is_empty() {
            return Err(NotificationError::config("notification id must not be empty"));
        }
        self.send(ManagerCommand::MarkRead(id)).await
    }

    pub async fn mark_all_as_read(&self) -> Result<()> {
        self.send(ManagerCommand::MarkAllRead).await
    }

    /// The user clicked a popup.
    pub async fn open_popup(&self, id: impl Into<NotificationId>) -> Result<()> {
        self.send(ManagerCommand::OpenPopup(id.into())).await
    }

    /// The user closed a popup without opening it.
    pub async fn dismiss_popup(&self, id: impl Into<NotificationId>) -> Result<()> {
        self.send(ManagerCommand::DismissPopup(id.into())).await
    }

    pub async fn set_visibility(&self, visibility: Visibility) -> Result<()> {
        self.send(ManagerCommand::SetVisibility(visibility)).await
    }

    /// Discard local state and reload from the server.
    pub async fn refresh(&self) -> Result<()> {
        self.send(ManagerCommand::Refresh).await
    }

    /// Poll immediately (polling) or reconnect if disconnected (streaming).
    pub async fn check_now(&self) -> Result<()> {
        self.send(ManagerCommand::CheckNow).await
    }

    pub async fn snapshot(&self) -> Result<NotificationListState> {
        let (tx, rx) = oneshot::channel();
        self.send(ManagerCommand::Snapshot(tx)).await?;
        rx.await.map_err(|_| NotificationError::Closed)
    }

    /// Streaming connection state; `None` when polling.
    pub async fn connection_state(&self) -> Result<Option<ConnectionState>> {
        let (tx, rx) = oneshot::channel();
        self.send(ManagerCommand::ConnectionState(tx)).await?;
        rx.await.map_err(|_| NotificationError::Closed)
    }

    /// Stop timers and the connection; the manager task exits.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(ManagerCommand::Shutdown).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, command: ManagerCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| NotificationError::Closed)
    }
}
