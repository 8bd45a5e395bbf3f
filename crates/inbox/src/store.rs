//! Notification state store.
//!
//! The store is the only place notification state is mutated. It never
//! recomputes the unread counter from the records: the server's figure is
//! authoritative, so every merge takes the counter as an argument.

use std::collections::HashSet;

use crate::model::{NotificationId, NotificationListState, NotificationRecord};

/// Ordered (newest-first) list of notifications plus the server's unread count.
#[derive(Debug, Clone, Default)]
pub struct NotificationStore {
    state: NotificationListState,
    history_limit: Option<usize>,
}

impl NotificationStore {
    pub fn new(history_limit: Option<usize>) -> Self {
        Self {
            state: NotificationListState::default(),
            history_limit,
        }
    }

    /// Current render model.
    pub fn state(&self) -> &NotificationListState {
        &self.state
    }

    pub fn snapshot(&self) -> NotificationListState {
        self.state.clone()
    }

    pub fn unread_count(&self) -> u64 {
        self.state.unread_count
    }

    pub fn len(&self) -> usize {
        self.state.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.notifications.is_empty()
    }

    pub fn contains(&self, id: &NotificationId) -> bool {
        self.state.notifications.iter().any(|n| &n.id == id)
    }

    pub fn get(&self, id: &NotificationId) -> Option<&NotificationRecord> {
        self.state.get(id)
    }

    /// Overwrite the list and counter (initial load and reloads).
    ///
    /// Repeated ids in `records` keep their first occurrence.
    pub fn replace(&mut self, records: Vec<NotificationRecord>, unread_count: u64) {
        self.state.notifications = dedupe_batch(records);
        self.state.unread_count = unread_count;
        self.enforce_history_limit();
    }

    /// Prepend `records` (newer than everything held) and adopt `unread_count`.
    ///
    /// An incoming id that is already present replaces the held record, which
    /// moves to the front with the rest of the batch. Returns how many ids were
    /// not present before.
    pub fn merge_newer(&mut self, records: Vec<NotificationRecord>, unread_count: u64) -> usize {
        let batch = dedupe_batch(records);
        let incoming: HashSet<&NotificationId> = batch.iter().map(|n| &n.id).collect();

        let before = self.state.notifications.len();
        let mut retained: Vec<NotificationRecord> = Vec::with_capacity(before);
        for record in self.state.notifications.drain(..) {
            if !incoming.contains(&record.id) {
                retained.push(record);
            }
        }
        let added = batch.len() - (before - retained.len());

        let mut merged = batch;
        merged.extend(retained);
        self.state.notifications = merged;
        self.state.unread_count = unread_count;
        self.enforce_history_limit();
        added
    }

    /// Flag one record as read. Leaves the counter alone.
    ///
    /// Returns `true` if a record changed state.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        match self
            .state
            .notifications
            .iter_mut()
            .find(|n| &n.id == id && n.unread)
        {
            Some(record) => {
                record.unread = false;
                true
            }
            None => false,
        }
    }

    /// Flag every record as read and zero the counter.
    pub fn mark_all_read(&mut self) {
        for record in &mut self.state.notifications {
            record.unread = false;
        }
        self.state.unread_count = 0;
    }

    /// Returns `true` if the counter changed.
    pub fn set_unread_count(&mut self, unread_count: u64) -> bool {
        let changed = self.state.unread_count != unread_count;
        self.state.unread_count = unread_count;
        changed
    }

    fn enforce_history_limit(&mut self) {
        if let Some(limit) = self.history_limit {
            self.state.notifications.truncate(limit);
        }
    }
}

fn dedupe_batch(records: Vec<NotificationRecord>) -> Vec<NotificationRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|n| seen.insert(n.id.clone()))
        .collect()
}
