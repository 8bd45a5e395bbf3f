//! Polling acquisition: a recurring `?since=` check.
//!
//! The strategy only tracks the cursor and the timer; the manager issues the
//! request and applies the result.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::debug;

#[derive(Debug)]
pub struct PollingStrategy {
    interval: Duration,
    timer: Option<Interval>,
    last_fetch_time: Option<DateTime<Utc>>,
}

impl PollingStrategy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timer: None,
            last_fetch_time: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// (Re)arm the recurring check. The first tick fires one interval from now;
    /// any previous timer is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, interval: Duration) {
        self.interval = interval;
        let mut timer = tokio::time::interval_at(Instant::now() + interval, interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
        debug!(interval_ms = interval.as_millis() as u64, "Notification polling started");
    }

    pub fn stop(&mut self) {
        self.timer = None;
    }

    /// Resolves on the next tick; never resolves while stopped.
    pub async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Value for the next `since` query.
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.last_fetch_time
    }

    /// Advance the cursor after a successful fetch, before its page is applied.
    ///
    /// The cursor never moves backwards, even if responses land out of order.
    pub fn mark_fetched(&mut self, at: DateTime<Utc>) {
        self.last_fetch_time = Some(match self.last_fetch_time {
            Some(previous) if previous > at => previous,
            _ => at,
        });
    }
}
