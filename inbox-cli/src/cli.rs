use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Inbox - follow a web application's notification feed from the terminal
#[derive(Parser, Debug)]
#[command(name = "inbox", version, about, long_about = None)]
pub struct Args {
    /// Site origin, e.g. https://app.example.com
    #[arg(long, global = true, env = "INBOX_BASE_URL")]
    pub base_url: Option<String>,

    /// Cookie header to send (session and csrftoken)
    #[arg(long, global = true, env = "INBOX_COOKIES", hide_env_values = true)]
    pub cookies: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow the feed and accept commands on stdin
    Watch {
        /// How new notifications are fetched
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,

        /// Polling interval or reconnect delay, in seconds
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        /// Load only unread notifications at start
        #[arg(long)]
        unread_only: bool,
    },

    /// Fetch the notification list once
    List {
        /// Only unread notifications
        #[arg(long)]
        unread_only: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Mark one notification as read
    MarkRead {
        /// Notification id
        id: String,
    },

    /// Mark every notification as read
    MarkAllRead,

    /// Show or reset configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Reset to defaults
        #[arg(long, conflicts_with = "show")]
        reset: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Polling,
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Pretty,
    /// JSON output
    Json,
}
