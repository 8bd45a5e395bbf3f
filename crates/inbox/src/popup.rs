//! Bounded queue of currently displayed popups.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::model::NotificationId;

/// Identifies one displayed popup.
///
/// A record can be shown more than once (e.g. re-delivered), so expiry timers
/// key on the handle rather than on the notification id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupHandle(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupEntry {
    pub handle: PopupHandle,
    pub id: NotificationId,
}

/// FIFO of popups, never longer than its capacity.
#[derive(Debug)]
pub struct PopupQueue {
    entries: VecDeque<PopupEntry>,
    capacity: usize,
    next_handle: u64,
}

impl PopupQueue {
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_handle: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &NotificationId) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }

    /// Ids in display order, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = &NotificationId> {
        self.entries.iter().map(|e| &e.id)
    }

    /// Show a popup for `id`, evicting the oldest one when full.
    pub fn push(&mut self, id: NotificationId) -> (PopupHandle, Option<PopupEntry>) {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };

        let handle = PopupHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.entries.push_back(PopupEntry { handle, id });
        (handle, evicted)
    }

    /// Remove the popup behind `handle`; `None` if it is already gone.
    pub fn expire(&mut self, handle: PopupHandle) -> Option<PopupEntry> {
        let pos = self.entries.iter().position(|e| e.handle == handle)?;
        self.entries.remove(pos)
    }

    /// Remove every popup showing `id`.
    pub fn remove(&mut self, id: &NotificationId) -> Vec<PopupEntry> {
        let mut removed = Vec::new();
        self.entries.retain(|e| {
            if &e.id == id {
                removed.push(e.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn clear(&mut self) -> Vec<PopupEntry> {
        self.entries.drain(..).collect()
    }
}
