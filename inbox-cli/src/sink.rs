//! Terminal rendering of the notification feed.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
#[cfg(feature = "colored-output")]
use colored::*;
use inbox::{
    Feedback, NotificationId, NotificationLevel, NotificationListState, NotificationRecord,
    PresentationSink,
};
use tracing::debug;

/// Rows printed per render.
const LIST_ROWS: usize = 10;

/// Relative age as shown next to each notification.
pub fn format_relative(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_ms = (now - created_at).num_milliseconds();
    let rounded = |unit: i64| (diff_ms as f64 / unit as f64).round() as i64;

    if diff_ms < 60_000 {
        "just now".to_string()
    } else if diff_ms < 3_600_000 {
        format!("{} min ago", rounded(60_000))
    } else if diff_ms < 86_400_000 {
        format!("{} hours ago", rounded(3_600_000))
    } else if diff_ms < 604_800_000 {
        format!("{} days ago", rounded(86_400_000))
    } else {
        created_at.format("%Y-%m-%d").to_string()
    }
}

/// Prints badge, list and popups to stdout.
pub struct TerminalSink {
    colored: bool,
}

impl TerminalSink {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_state(&self, state: &NotificationListState, now: DateTime<Utc>) -> String {
        let mut output = String::new();
        output.push_str(&self.badge(state.unread_count));
        output.push('\n');

        if state.is_empty() {
            output.push_str("  No notifications\n");
            return output;
        }

        for record in state.notifications.iter().take(LIST_ROWS) {
            output.push_str(&self.format_row(record, now));
            output.push('\n');
        }
        if state.notifications.len() > LIST_ROWS {
            output.push_str(&format!(
                "  ... and {} more\n",
                state.notifications.len() - LIST_ROWS
            ));
        }
        output
    }

    pub fn format_row(&self, record: &NotificationRecord, now: DateTime<Utc>) -> String {
        let marker = if record.unread { "*" } else { " " };
        let mut row = format!(
            "{marker} {} {} {} ({})",
            self.level_tag(record.level),
            self.bold(&record.title),
            record.message,
            format_relative(record.created_at, now)
        );
        if let Some(url) = &record.action_url {
            row.push_str(&format!(" [{}: {url}]", record.action_label()));
        }
        row.push_str(&format!("  #{}", record.id));
        row
    }

    fn badge(&self, unread: u64) -> String {
        let text = match unread {
            0 => "No unread notifications".to_string(),
            1 => "1 unread notification".to_string(),
            n => format!("{n} unread notifications"),
        };
        self.bold(&text)
    }

    fn level_tag(&self, level: NotificationLevel) -> String {
        let tag = format!("[{level}]");
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                return match level {
                    NotificationLevel::Success => tag.green().to_string(),
                    NotificationLevel::Warning => tag.yellow().to_string(),
                    NotificationLevel::Error => tag.red().to_string(),
                    NotificationLevel::Info | NotificationLevel::Other => tag.blue().to_string(),
                };
            }
        }
        tag
    }

    fn bold(&self, text: &str) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                return text.bold().to_string();
            }
        }
        text.to_string()
    }
}

impl PresentationSink for TerminalSink {
    fn render(&mut self, state: &NotificationListState) {
        print!("{}", self.format_state(state, Utc::now()));
        let _ = io::stdout().flush();
    }

    fn show_popup(&mut self, record: &NotificationRecord) {
        println!(
            ">> {} {}: {}  #{}",
            self.level_tag(record.level),
            self.bold(&record.title),
            record.message,
            record.id
        );
    }

    fn remove_popup(&mut self, id: &NotificationId) {
        debug!(%id, "Popup dismissed");
    }

    fn feedback(&mut self, feedback: Feedback) {
        if feedback.sound {
            print!("\x07");
            let _ = io::stdout().flush();
        }
    }

    fn navigate(&mut self, url: &str) {
        println!("Open: {url}");
    }
}
