//! Streaming acquisition: one persistent connection, fixed-delay reconnects.
//!
//! The strategy is driven from the manager's task. Spawned work (the open
//! attempt, the read/write pump, reconnect timers) only reports back through
//! [`StreamEvent`]s, each tagged with the attempt generation that produced it.
//! Events from a superseded attempt are dropped, and a reconnect timer that
//! fires while an attempt is already in flight does nothing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::protocol::OutboundFrame;
use super::transport::FrameTransport;

const OUTBOUND_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        })
    }
}

#[derive(Debug)]
pub struct StreamEvent {
    generation: u64,
    kind: StreamEventKind,
}

#[derive(Debug)]
enum StreamEventKind {
    Opened,
    Frame(String),
    /// Connection ended; `Some` carries the error that ended it.
    Closed(Option<String>),
    /// The open attempt itself failed.
    Failed(String),
    ReconnectDue,
}

impl StreamEvent {
    fn new(generation: u64, kind: StreamEventKind) -> Self {
        Self { generation, kind }
    }
}

/// What the manager has to act on after a [`StreamEvent`].
#[derive(Debug, PartialEq, Eq)]
pub enum StreamUpdate {
    /// First successful connection.
    Opened,
    /// Connected again after losing the connection; state may have drifted.
    Reopened,
    /// An inbound text frame to dispatch.
    Frame(String),
    /// The connection dropped or could not be opened; a retry is scheduled.
    Lost,
    Nothing,
}

/// Connection state machine for the streaming variant.
pub struct StreamingStrategy {
    url: Url,
    transport: Arc<dyn FrameTransport>,
    reconnect_interval: Duration,
    state: ConnectionState,
    generation: u64,
    attempts: u64,
    ever_connected: bool,
    stopped: bool,
    outbound: Option<mpsc::Sender<String>>,
    task: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<StreamEvent>,
}

impl StreamingStrategy {
    pub fn new(
        url: Url,
        transport: Arc<dyn FrameTransport>,
        reconnect_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let strategy = Self {
            url,
            transport,
            reconnect_interval,
            state: ConnectionState::Disconnected,
            generation: 0,
            attempts: 0,
            ever_connected: false,
            stopped: false,
            outbound: None,
            task: None,
            events,
        };
        (strategy, events_rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Total open attempts so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Start an attempt unless one is in flight or a connection is up.
    ///
    /// Returns `true` if an attempt was started. Must be called from within a
    /// tokio runtime.
    pub fn connect(&mut self) -> bool {
        if self.stopped || self.state != ConnectionState::Disconnected {
            return false;
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }

        self.state = ConnectionState::Connecting;
        self.generation += 1;
        self.attempts += 1;
        debug!(url = %self.url, attempt = self.attempts, "Connecting to notification stream");

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
        self.outbound = Some(outbound_tx);

        let transport = self.transport.clone();
        let url = self.url.clone();
        let events = self.events.clone();
        let generation = self.generation;

        self.task = Some(tokio::spawn(async move {
            let mut channel = match transport.open(&url).await {
                Ok(channel) => channel,
                Err(e) => {
                    let _ = events.send(StreamEvent::new(
                        generation,
                        StreamEventKind::Failed(e.to_string()),
                    ));
                    return;
                }
            };

            if events
                .send(StreamEvent::new(generation, StreamEventKind::Opened))
                .is_err()
            {
                channel.close().await;
                return;
            }

            let reason = loop {
                tokio::select! {
                    Some(text) = outbound_rx.recv() => {
                        if let Err(e) = channel.send_text(text).await {
                            break Some(e.to_string());
                        }
                    }

                    frame = channel.next_text() => {
                        match frame {
                            Some(Ok(text)) => {
                                let event = StreamEvent::new(generation, StreamEventKind::Frame(text));
                                if events.send(event).is_err() {
                                    channel.close().await;
                                    return;
                                }
                            }
                            Some(Err(e)) => break Some(e.to_string()),
                            None => break None,
                        }
                    }
                }
            };

            let _ = events.send(StreamEvent::new(
                generation,
                StreamEventKind::Closed(reason),
            ));
        }));

        true
    }

    /// Apply one event to the state machine.
    pub fn handle(&mut self, event: StreamEvent) -> StreamUpdate {
        if let StreamEventKind::ReconnectDue = event.kind {
            // Stale timers fall through the guard in `connect`.
            self.connect();
            return StreamUpdate::Nothing;
        }

        if event.generation != self.generation || self.stopped {
            debug!(
                generation = event.generation,
                current = self.generation,
                "Dropping event from superseded connection"
            );
            return StreamUpdate::Nothing;
        }

        match event.kind {
            StreamEventKind::Opened => {
                self.state = ConnectionState::Connected;
                let reopened = self.ever_connected;
                self.ever_connected = true;
                info!(url = %self.url, "Notification stream connected");
                if reopened {
                    StreamUpdate::Reopened
                } else {
                    StreamUpdate::Opened
                }
            }
            StreamEventKind::Frame(text) => StreamUpdate::Frame(text),
            StreamEventKind::Closed(reason) => {
                match reason {
                    Some(error) => warn!(%error, "Notification stream failed"),
                    None => info!("Notification stream closed"),
                }
                self.on_lost();
                StreamUpdate::Lost
            }
            StreamEventKind::Failed(error) => {
                warn!(%error, "Notification stream connection failed");
                self.on_lost();
                StreamUpdate::Lost
            }
            StreamEventKind::ReconnectDue => StreamUpdate::Nothing,
        }
    }

    /// Queue a frame on the live connection. Dropped when not connected.
    pub fn send_best_effort(&self, frame: &OutboundFrame) {
        if !self.is_connected() {
            debug!(?frame, "Not connected; skipping stream send");
            return;
        }
        let Some(outbound) = &self.outbound else {
            return;
        };
        match frame.encode() {
            Ok(text) => {
                if let Err(e) = outbound.try_send(text) {
                    debug!(error = %e, "Stream send dropped");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode outbound frame"),
        }
    }

    /// Tear down the connection and stop reconnecting.
    pub fn shutdown(&mut self) {
        self.stopped = true;
        self.outbound = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state = ConnectionState::Disconnected;
    }

    fn on_lost(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.outbound = None;

        let events = self.events.clone();
        let delay = self.reconnect_interval;
        let generation = self.generation;
        debug!(delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(StreamEvent::new(generation, StreamEventKind::ReconnectDue));
        });
    }
}

impl Drop for StreamingStrategy {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
