//! # inbox
//!
//! Client side of a web application's notification feed.
//!
//! The crate keeps a local, newest-first list of notifications with read/unread
//! state and drives a [`PresentationSink`] (badge, list, transient popups) from
//! it. New notifications arrive either by polling the HTTP API on a timer or
//! over a persistent WebSocket with fixed-delay reconnection; both variants
//! feed the same [`NotificationStore`].
//!
//! ```no_run
//! use inbox::{ManagerConfig, NotificationManager, PresentationSink};
//! # use inbox::{NotificationId, NotificationListState, NotificationRecord};
//! # struct Sink;
//! # impl PresentationSink for Sink {
//! #     fn render(&mut self, _: &NotificationListState) {}
//! #     fn show_popup(&mut self, _: &NotificationRecord) {}
//! #     fn remove_popup(&mut self, _: &NotificationId) {}
//! # }
//! # async fn demo() -> inbox::Result<()> {
//! let config = ManagerConfig::new("https://app.example.com").with_cookies("csrftoken=abc");
//! let (handle, task) = NotificationManager::with_http(config, Sink)?.spawn();
//! handle.mark_all_as_read().await?;
//! handle.shutdown().await?;
//! let _ = task.await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod manager;
pub mod model;
pub mod polling;
pub mod popup;
pub mod sink;
pub mod store;
pub mod stream;

pub use api::{HttpNotificationApi, NotificationApi, NotificationPage, install_rustls_provider};
pub use config::{AcquisitionMode, ManagerConfig, PopupConfig};
pub use error::{NotificationError, Result};
pub use manager::{ManagerHandle, NotificationManager, Visibility};
pub use model::{NotificationId, NotificationLevel, NotificationListState, NotificationRecord};
pub use sink::{Feedback, PresentationSink};
pub use store::NotificationStore;
pub use stream::{ConnectionState, FrameTransport, WebSocketTransport};
