//! The notification manager actor.
//!
//! A single task owns the store, the popup queue, the sink and one acquisition
//! strategy. Everything that touches notification state runs inside its
//! `select!` loop, one event at a time:
//! - user commands from [`ManagerHandle`]s
//! - completions of HTTP requests and popup timers it spawned
//! - polling ticks or stream events, depending on the mode
//!
//! Spawned work never touches state directly; it only posts events back, so
//! responses may arrive in any order without locks.

mod events;
mod handle;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::api::{
    HttpNotificationApi, MarkAllReadResponse, MarkReadResponse, NotificationApi, NotificationPage,
};
use crate::config::{AcquisitionMode, ManagerConfig};
use crate::error::{NotificationError, Result};
use crate::model::{NotificationId, NotificationRecord};
use crate::polling::PollingStrategy;
use crate::popup::{PopupHandle, PopupQueue};
use crate::sink::{Feedback, PresentationSink};
use crate::store::NotificationStore;
use crate::stream::{
    ConnectionState, FrameTransport, InboundFrame, OutboundFrame, StreamEvent, StreamUpdate,
    StreamingStrategy, WebSocketTransport, decode_frame,
};

use events::{CommandResult, ManagerCommand, ManagerEvent};

pub use events::Visibility;
pub use handle::ManagerHandle;

const COMMAND_CAPACITY: usize = 64;

enum Acquisition {
    Polling(PollingStrategy),
    Streaming {
        strategy: StreamingStrategy,
        events: mpsc::UnboundedReceiver<StreamEvent>,
    },
}

enum Wake {
    PollDue,
    Stream(StreamEvent),
}

impl Acquisition {
    /// Next polling tick or stream event.
    async fn next(&mut self) -> Wake {
        match self {
            Self::Polling(polling) => {
                polling.tick().await;
                Wake::PollDue
            }
            Self::Streaming { events, .. } => match events.recv().await {
                Some(event) => Wake::Stream(event),
                None => std::future::pending().await,
            },
        }
    }
}

/// Drives one notification feed into a [`PresentationSink`].
pub struct NotificationManager<S: PresentationSink> {
    config: ManagerConfig,
    api: Arc<dyn NotificationApi>,
    store: NotificationStore,
    popups: PopupQueue,
    sink: S,
    acquisition: Acquisition,
    visibility: Visibility,
    load_seq: u64,
    events_tx: mpsc::UnboundedSender<ManagerEvent>,
    events_rx: mpsc::UnboundedReceiver<ManagerEvent>,
}

impl<S: PresentationSink> NotificationManager<S> {
    /// Build a manager over explicit source and transport implementations.
    pub fn new(
        config: ManagerConfig,
        api: Arc<dyn NotificationApi>,
        transport: Arc<dyn FrameTransport>,
        sink: S,
    ) -> Result<Self> {
        config.validate()?;

        let acquisition = match config.mode {
            AcquisitionMode::Polling { interval_ms } => Acquisition::Polling(PollingStrategy::new(
                Duration::from_millis(interval_ms),
            )),
            AcquisitionMode::Streaming {
                reconnect_interval_ms,
            } => {
                let (strategy, events) = StreamingStrategy::new(
                    config.stream_url()?,
                    transport,
                    Duration::from_millis(reconnect_interval_ms),
                );
                Acquisition::Streaming { strategy, events }
            }
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Ok(Self {
            store: NotificationStore::new(config.history_limit),
            popups: PopupQueue::new(config.popup.capacity()?),
            api,
            sink,
            acquisition,
            visibility: Visibility::Visible,
            load_seq: 0,
            events_tx,
            events_rx,
            config,
        })
    }

    /// Build a manager talking to the configured server over HTTP and WebSocket.
    pub fn with_http(config: ManagerConfig, sink: S) -> Result<Self> {
        let api = Arc::new(HttpNotificationApi::new(&config)?);
        let transport = Arc::new(WebSocketTransport::new(config.cookies.clone()));
        Self::new(config, api, transport, sink)
    }

    /// Start the manager task.
    ///
    /// The task stops on [`ManagerHandle::shutdown`] or once every handle has
    /// been dropped.
    pub fn spawn(self) -> (ManagerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let task = tokio::spawn(self.run(rx));
        (ManagerHandle::new(tx), task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<ManagerCommand>) {
        info!(
            base_url = %self.config.base_url,
            mode = self.config.mode.name(),
            "Notification manager started"
        );

        self.sink.render(self.store.state());
        self.load();
        match &mut self.acquisition {
            Acquisition::Polling(polling) => {
                let interval = polling.interval();
                polling.start(interval);
            }
            Acquisition::Streaming { strategy, .. } => {
                strategy.connect();
            }
        }

        loop {
            tokio::select! {
                biased;

                cmd = commands.recv() => {
                    if self.handle_command(cmd) == CommandResult::Stop {
                        break;
                    }
                }

                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event);
                }

                wake = self.acquisition.next() => {
                    match wake {
                        Wake::PollDue => self.check_for_new(),
                        Wake::Stream(event) => self.handle_stream_event(event),
                    }
                }
            }
        }

        info!("Notification manager stopped");
    }

    fn handle_command(&mut self, cmd: Option<ManagerCommand>) -> CommandResult {
        match cmd {
            Some(ManagerCommand::MarkRead(id)) => self.mark_as_read(id),
            Some(ManagerCommand::MarkAllRead) => self.mark_all_as_read(),
            Some(ManagerCommand::OpenPopup(id)) => self.open_popup(id),
            Some(ManagerCommand::DismissPopup(id)) => self.dismiss_popup(&id),
            Some(ManagerCommand::SetVisibility(visibility)) => self.set_visibility(visibility),
            Some(ManagerCommand::Refresh) => self.load(),
            Some(ManagerCommand::CheckNow) => self.check_now(),
            Some(ManagerCommand::Snapshot(reply)) => {
                let _ = reply.send(self.store.snapshot());
            }
            Some(ManagerCommand::ConnectionState(reply)) => {
                let _ = reply.send(self.connection_state());
            }
            Some(ManagerCommand::Shutdown) | None => {
                self.shutdown();
                return CommandResult::Stop;
            }
        }
        CommandResult::Continue
    }

    fn handle_event(&mut self, event: ManagerEvent) {
        match event {
            ManagerEvent::Loaded { seq, result } => self.on_loaded(seq, result),
            ManagerEvent::Polled(result) => self.on_polled(result),
            ManagerEvent::MarkReadConfirmed { id, result } => self.on_mark_read_confirmed(id, result),
            ManagerEvent::MarkAllReadConfirmed(result) => self.on_mark_all_read_confirmed(result),
            ManagerEvent::PopupExpired(handle) => self.on_popup_expired(handle),
        }
    }

    /// Full fetch; the result replaces local state.
    fn load(&mut self) {
        self.load_seq += 1;
        let seq = self.load_seq;
        let api = self.api.clone();
        let unread_only = self.config.unread_only;
        let events = self.events_tx.clone();
        debug!(seq, unread_only, "Loading notifications");
        tokio::spawn(async move {
            let result = api.list(unread_only).await;
            let _ = events.send(ManagerEvent::Loaded { seq, result });
        });
    }

    fn on_loaded(&mut self, seq: u64, result: Result<NotificationPage>) {
        if seq != self.load_seq {
            debug!(seq, latest = self.load_seq, "Discarding superseded load");
            return;
        }
        match result {
            Ok(page) => {
                if let Acquisition::Polling(polling) = &mut self.acquisition {
                    polling.mark_fetched(Utc::now());
                }
                self.store.replace(page.notifications, page.unread_count);
                self.sink.render(self.store.state());
                debug!(
                    count = self.store.len(),
                    unread = self.store.unread_count(),
                    "Notifications loaded"
                );
            }
            Err(e) => log_failure("load notifications", &e),
        }
    }

    /// One `?since=` request; the response is applied in [`Self::on_polled`].
    fn check_for_new(&mut self) {
        let Acquisition::Polling(polling) = &self.acquisition else {
            return;
        };
        let since = polling.cursor();
        let api = self.api.clone();
        let events = self.events_tx.clone();
        trace!(?since, "Checking for new notifications");
        tokio::spawn(async move {
            let result = api.since(since).await;
            let _ = events.send(ManagerEvent::Polled(result));
        });
    }

    fn on_polled(&mut self, result: Result<NotificationPage>) {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                log_failure("check for new notifications", &e);
                return;
            }
        };

        if let Acquisition::Polling(polling) = &mut self.acquisition {
            polling.mark_fetched(Utc::now());
        }

        if page.notifications.is_empty() {
            if self.store.set_unread_count(page.unread_count) {
                self.sink.render(self.store.state());
            }
            return;
        }

        self.apply_new(page.notifications, page.unread_count);
    }

    /// Merge a batch of new records, then show popups and emit feedback.
    ///
    /// Records already held (e.g. delivered by an overlapping check) are
    /// merged but not announced again.
    fn apply_new(&mut self, records: Vec<NotificationRecord>, unread_count: u64) {
        let mut seen = HashSet::new();
        let fresh: Vec<NotificationRecord> = records
            .iter()
            .filter(|record| !self.store.contains(&record.id) && seen.insert(record.id.clone()))
            .cloned()
            .collect();

        let batch = records.len();
        let added = self.store.merge_newer(records, unread_count);
        debug!(batch, added, unread_count, "New notifications");
        self.sink.render(self.store.state());

        if fresh.is_empty() {
            return;
        }

        for record in &fresh {
            self.show_popup(record);
        }

        let feedback = Feedback {
            sound: self.config.sound_enabled,
            vibrate: self.config.vibration_enabled,
        };
        if !feedback.is_silent() {
            self.sink.feedback(feedback);
        }
    }

    fn show_popup(&mut self, record: &NotificationRecord) {
        let (handle, evicted) = self.popups.push(record.id.clone());
        if let Some(entry) = evicted {
            self.sink.remove_popup(&entry.id);
        }
        self.sink.show_popup(record);

        let events = self.events_tx.clone();
        let duration = self.config.popup.duration();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = events.send(ManagerEvent::PopupExpired(handle));
        });
    }

    fn on_popup_expired(&mut self, handle: PopupHandle) {
        if let Some(entry) = self.popups.expire(handle) {
            self.sink.remove_popup(&entry.id);
        }
    }

    fn mark_as_read(&mut self, id: NotificationId) {
        if id.is_empty() {
            warn!("Ignoring mark-read for an empty id");
            return;
        }

        if self.store.mark_read(&id) {
            self.sink.render(self.store.state());
        }

        let api = self.api.clone();
        let events = self.events_tx.clone();
        let request_id = id.clone();
        tokio::spawn(async move {
            let result = api.mark_read(&request_id).await;
            let _ = events.send(ManagerEvent::MarkReadConfirmed {
                id: request_id,
                result,
            });
        });

        if let Acquisition::Streaming { strategy, .. } = &self.acquisition {
            strategy.send_best_effort(&OutboundFrame::MarkRead { id });
        }
    }

    fn on_mark_read_confirmed(&mut self, id: NotificationId, result: Result<MarkReadResponse>) {
        match result {
            Ok(response) if response.success => {
                self.store.mark_read(&id);
                self.store.set_unread_count(response.unread_count);
                self.sink.render(self.store.state());
            }
            Ok(_) => {
                let e = NotificationError::Rejected(format!("mark-read {id}"));
                log_failure("mark notification as read", &e);
                self.load();
            }
            Err(e) => {
                log_failure("mark notification as read", &e);
                self.load();
            }
        }
    }

    fn mark_all_as_read(&mut self) {
        self.store.mark_all_read();
        self.sink.render(self.store.state());

        let api = self.api.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api.mark_all_read().await;
            let _ = events.send(ManagerEvent::MarkAllReadConfirmed(result));
        });

        if let Acquisition::Streaming { strategy, .. } = &self.acquisition {
            strategy.send_best_effort(&OutboundFrame::MarkAllRead);
        }
    }

    fn on_mark_all_read_confirmed(&mut self, result: Result<MarkAllReadResponse>) {
        match result {
            Ok(response) if response.success => {
                debug!(marked = ?response.count, "All notifications marked as read");
                if let Some(count) = response.unread_count
                    && self.store.set_unread_count(count)
                {
                    self.sink.render(self.store.state());
                }
            }
            Ok(_) => {
                let e = NotificationError::Rejected("mark-all-read".to_string());
                log_failure("mark all notifications as read", &e);
                self.load();
            }
            Err(e) => {
                log_failure("mark all notifications as read", &e);
                self.load();
            }
        }
    }

    fn open_popup(&mut self, id: NotificationId) {
        let action_url = self
            .store
            .get(&id)
            .and_then(|record| record.action_url.clone());

        self.mark_as_read(id.clone());
        self.dismiss_popup(&id);

        if let Some(url) = action_url {
            self.sink.navigate(&url);
        }
    }

    fn dismiss_popup(&mut self, id: &NotificationId) {
        if !self.popups.remove(id).is_empty() {
            self.sink.remove_popup(id);
        }
    }

    fn check_now(&mut self) {
        if let Acquisition::Streaming { strategy, .. } = &mut self.acquisition {
            strategy.connect();
            return;
        }
        self.check_for_new();
    }

    fn set_visibility(&mut self, visibility: Visibility) {
        let previous = std::mem::replace(&mut self.visibility, visibility);
        trace!(?previous, ?visibility, "Visibility changed");
        if previous == Visibility::Hidden && visibility == Visibility::Visible {
            self.check_for_new();
        }
    }

    fn handle_stream_event(&mut self, event: StreamEvent) {
        let Acquisition::Streaming { strategy, .. } = &mut self.acquisition else {
            return;
        };
        match strategy.handle(event) {
            StreamUpdate::Frame(text) => self.dispatch_frame(&text),
            // Pushes sent while we were away are lost; resynchronise.
            StreamUpdate::Reopened => self.load(),
            StreamUpdate::Opened | StreamUpdate::Lost | StreamUpdate::Nothing => {}
        }
    }

    fn dispatch_frame(&mut self, text: &str) {
        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping malformed notification frame");
                return;
            }
        };

        match frame {
            InboundFrame::Created(record) => {
                // Provisional; the server follows up with an `unread_count` frame.
                let unread_count = if self.store.contains(&record.id) {
                    self.store.unread_count()
                } else {
                    self.store.unread_count() + 1
                };
                self.apply_new(vec![record], unread_count);
            }
            InboundFrame::Read(id) => {
                if self.store.mark_read(&id) {
                    self.sink.render(self.store.state());
                }
            }
            InboundFrame::UnreadCount(count) => {
                if self.store.set_unread_count(count) {
                    self.sink.render(self.store.state());
                }
            }
            InboundFrame::Unknown(kind) => trace!(%kind, "Ignoring notification frame"),
        }
    }

    fn shutdown(&mut self) {
        match &mut self.acquisition {
            Acquisition::Polling(polling) => polling.stop(),
            Acquisition::Streaming { strategy, .. } => strategy.shutdown(),
        }
        for entry in self.popups.clear() {
            self.sink.remove_popup(&entry.id);
        }
    }

    /// Streaming connection state; `None` in polling mode.
    pub fn connection_state(&self) -> Option<ConnectionState> {
        match &self.acquisition {
            Acquisition::Polling(_) => None,
            Acquisition::Streaming { strategy, .. } => Some(strategy.state()),
        }
    }
}

fn log_failure(action: &str, error: &NotificationError) {
    match error {
        NotificationError::Payload(_) | NotificationError::Rejected(_) => {
            warn!(%error, "Failed to {action}")
        }
        _ => debug!(%error, "Failed to {action}"),
    }
}
