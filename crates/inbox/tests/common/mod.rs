//! Shared fakes for the manager integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use inbox::api::{MarkAllReadResponse, MarkReadResponse, NotificationApi, NotificationPage};
use inbox::stream::{FrameChannel, FrameTransport};
use inbox::{
    Feedback, NotificationError, NotificationId, NotificationLevel, NotificationListState,
    NotificationRecord, PresentationSink, Result,
};

/// Let spawned tasks and the manager drain their queues without moving the clock.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

pub fn record(id: &str, unread: bool) -> NotificationRecord {
    let mut record = NotificationRecord::new(
        id,
        format!("title {id}"),
        format!("message {id}"),
        NotificationLevel::Info,
        Utc::now() - TimeDelta::minutes(1),
    );
    record.unread = unread;
    record
}

pub fn page(records: Vec<NotificationRecord>, unread_count: u64) -> NotificationPage {
    NotificationPage {
        notifications: records,
        unread_count,
        total_count: None,
        has_more: false,
    }
}

pub fn ids(state: &NotificationListState) -> Vec<&str> {
    state.notifications.iter().map(|n| n.id.as_str()).collect()
}

pub fn server_error() -> NotificationError {
    NotificationError::Status {
        status: 500,
        body: "boom".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    List(bool),
    Since(Option<DateTime<Utc>>),
    MarkRead(NotificationId),
    MarkAllRead,
}

#[derive(Default)]
struct FakeApiState {
    calls: Vec<ApiCall>,
    list: VecDeque<Result<NotificationPage>>,
    since: VecDeque<Result<NotificationPage>>,
    mark_read: VecDeque<Result<MarkReadResponse>>,
    mark_all_read: VecDeque<Result<MarkAllReadResponse>>,
    server_unread: u64,
}

/// Programmable notification source.
///
/// Each endpoint pops a queued response; with nothing queued it answers with
/// an empty page (or a successful confirmation) carrying `server_unread`.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeApiState>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_server_unread(&self, count: u64) {
        self.state.lock().server_unread = count;
    }

    pub fn push_list(&self, response: Result<NotificationPage>) {
        self.state.lock().list.push_back(response);
    }

    pub fn push_since(&self, response: Result<NotificationPage>) {
        self.state.lock().since.push_back(response);
    }

    pub fn push_mark_read(&self, response: Result<MarkReadResponse>) {
        self.state.lock().mark_read.push_back(response);
    }

    pub fn push_mark_all_read(&self, response: Result<MarkAllReadResponse>) {
        self.state.lock().mark_all_read.push_back(response);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ApiCall::List(_)))
            .count()
    }

    pub fn since_calls(&self) -> Vec<Option<DateTime<Utc>>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Since(since) => Some(since),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl NotificationApi for FakeApi {
    async fn list(&self, unread_only: bool) -> Result<NotificationPage> {
        let mut state = self.state.lock();
        state.calls.push(ApiCall::List(unread_only));
        let unread = state.server_unread;
        state.list.pop_front().unwrap_or_else(|| Ok(page(vec![], unread)))
    }

    async fn since(&self, since: Option<DateTime<Utc>>) -> Result<NotificationPage> {
        let mut state = self.state.lock();
        state.calls.push(ApiCall::Since(since));
        let unread = state.server_unread;
        state.since.pop_front().unwrap_or_else(|| Ok(page(vec![], unread)))
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<MarkReadResponse> {
        let mut state = self.state.lock();
        state.calls.push(ApiCall::MarkRead(id.clone()));
        let unread = state.server_unread;
        state.mark_read.pop_front().unwrap_or(Ok(MarkReadResponse {
            success: true,
            unread_count: unread,
        }))
    }

    async fn mark_all_read(&self) -> Result<MarkAllReadResponse> {
        let mut state = self.state.lock();
        state.calls.push(ApiCall::MarkAllRead);
        state.mark_all_read.pop_front().unwrap_or(Ok(MarkAllReadResponse {
            success: true,
            count: Some(0),
            unread_count: Some(0),
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Render { ids: Vec<String>, unread_count: u64 },
    ShowPopup(String),
    RemovePopup(String),
    Feedback(Feedback),
    Navigate(String),
}

/// Sink that records every call for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn renders(&self) -> usize {
        self.count(|c| matches!(c, SinkCall::Render { .. }))
    }

    pub fn shown(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::ShowPopup(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::RemovePopup(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&SinkCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }
}

impl PresentationSink for RecordingSink {
    fn render(&mut self, state: &NotificationListState) {
        self.calls.lock().push(SinkCall::Render {
            ids: state.notifications.iter().map(|n| n.id.to_string()).collect(),
            unread_count: state.unread_count,
        });
    }

    fn show_popup(&mut self, record: &NotificationRecord) {
        self.calls
            .lock()
            .push(SinkCall::ShowPopup(record.id.to_string()));
    }

    fn remove_popup(&mut self, id: &NotificationId) {
        self.calls.lock().push(SinkCall::RemovePopup(id.to_string()));
    }

    fn feedback(&mut self, feedback: Feedback) {
        self.calls.lock().push(SinkCall::Feedback(feedback));
    }

    fn navigate(&mut self, url: &str) {
        self.calls.lock().push(SinkCall::Navigate(url.to_string()));
    }
}

/// Server side of a fake connection.
pub struct ServerEnd {
    /// Frames pushed to the client. Drop to close the connection.
    pub push: mpsc::UnboundedSender<String>,
    /// Frames the client sent.
    pub sent: mpsc::UnboundedReceiver<String>,
}

struct FakeChannel {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl FrameChannel for FakeChannel {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.outbound
            .send(text)
            .map_err(|_| NotificationError::connection("peer gone"))
    }

    async fn next_text(&mut self) -> Option<Result<String>> {
        self.inbound.recv().await.map(Ok)
    }
}

/// Transport whose first `failures` opens fail; later opens hand the server
/// end of an in-memory channel to the test.
pub struct FakeTransport {
    failures_left: Mutex<usize>,
    open_delay: Duration,
    attempts: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    opened: mpsc::UnboundedSender<ServerEnd>,
}

impl FakeTransport {
    pub fn new(failures: usize) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        Self::with_delay(failures, Duration::ZERO)
    }

    pub fn always_failing() -> Arc<Self> {
        Self::new(usize::MAX).0
    }

    pub fn with_delay(
        failures: usize,
        open_delay: Duration,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (opened, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            failures_left: Mutex::new(failures),
            open_delay,
            attempts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            opened,
        });
        (transport, rx)
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameTransport for FakeTransport {
    async fn open(&self, _url: &Url) -> Result<Box<dyn FrameChannel>> {
        self.attempts.lock().push(Instant::now());
        let live = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(live, Ordering::SeqCst);

        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        {
            let mut failures = self.failures_left.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(NotificationError::connection("connection refused"));
            }
        }

        let (push, inbound) = mpsc::unbounded_channel();
        let (outbound, sent) = mpsc::unbounded_channel();
        let _ = self.opened.send(ServerEnd { push, sent });
        Ok(Box::new(FakeChannel { inbound, outbound }))
    }
}
