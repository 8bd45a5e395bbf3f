//! Presentation sink: where state snapshots and popups go.
//!
//! The manager calls into the sink after every state mutation. Implementations
//! own everything visual (badges, list rows, popup widgets, sounds).

use crate::model::{NotificationId, NotificationListState, NotificationRecord};

/// Attention cues for a batch of newly arrived notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Feedback {
    /// Play the notification sound (once per batch).
    pub sound: bool,
    /// Vibrate (once per batch).
    pub vibrate: bool,
}

impl Feedback {
    pub fn is_silent(&self) -> bool {
        !self.sound && !self.vibrate
    }
}

/// Consumer of the render model.
pub trait PresentationSink: Send + 'static {
    /// Redraw badges and the list from `state`.
    fn render(&mut self, state: &NotificationListState);

    /// Display a transient popup for `record`.
    fn show_popup(&mut self, record: &NotificationRecord);

    /// Take down the popup(s) for `id`.
    fn remove_popup(&mut self, id: &NotificationId);

    /// Sound/vibration cue.
    fn feedback(&mut self, _feedback: Feedback) {}

    /// Follow a notification's action link after it was opened.
    fn navigate(&mut self, _url: &str) {}
}

impl<S: PresentationSink + ?Sized> PresentationSink for Box<S> {
    fn render(&mut self, state: &NotificationListState) {
        (**self).render(state)
    }

    fn show_popup(&mut self, record: &NotificationRecord) {
        (**self).show_popup(record)
    }

    fn remove_popup(&mut self, id: &NotificationId) {
        (**self).remove_popup(id)
    }

    fn feedback(&mut self, feedback: Feedback) {
        (**self).feedback(feedback)
    }

    fn navigate(&mut self, url: &str) {
        (**self).navigate(url)
    }
}
