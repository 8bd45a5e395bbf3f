use std::time::Duration;

use chrono::Utc;
use inbox::api::NotificationApi;
use inbox::{
    AcquisitionMode, HttpNotificationApi, ManagerHandle, NotificationId, NotificationManager,
    Visibility,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::cli::{Mode, OutputFormat};
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::sink::TerminalSink;

const WATCH_HELP: &str =
    "Commands: read <id> | all | open <id> | close <id> | refresh | check | hide | show | quit";

/// A line typed while watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Read(NotificationId),
    ReadAll,
    Open(NotificationId),
    Close(NotificationId),
    Refresh,
    Check,
    Hide,
    Show,
    Help,
    Quit,
}

impl WatchCommand {
    /// `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let arg = parts.next();

        let id = |arg: Option<&str>| {
            arg.map(NotificationId::from)
                .ok_or_else(|| AppError::InvalidInput(format!("`{verb}` needs a notification id")))
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "read" => Self::Read(id(arg)?),
            "all" => Self::ReadAll,
            "open" => Self::Open(id(arg)?),
            "close" => Self::Close(id(arg)?),
            "refresh" => Self::Refresh,
            "check" => Self::Check,
            "hide" => Self::Hide,
            "show" => Self::Show,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(AppError::InvalidInput(format!("unknown command `{other}`"))),
        };
        Ok(Some(command))
    }
}

pub struct CommandExecutor {
    config: AppConfig,
}

impl CommandExecutor {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn api(&self) -> Result<HttpNotificationApi> {
        Ok(HttpNotificationApi::new(&self.config.manager_config())?)
    }

    pub async fn watch(
        &self,
        mode: Option<Mode>,
        interval: Option<u64>,
        unread_only: bool,
    ) -> Result<()> {
        let mut manager_config = self.config.manager_config();
        manager_config.unread_only |= unread_only;
        manager_config.mode = resolve_mode(manager_config.mode, mode, interval);

        let sink = TerminalSink::new(self.config.colored);
        let manager = NotificationManager::with_http(manager_config, sink)?;
        let (handle, task) = manager.spawn();
        println!("{WATCH_HELP}");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    match WatchCommand::parse(&line) {
                        Ok(Some(WatchCommand::Quit)) => break,
                        Ok(Some(command)) => execute(&handle, command).await?,
                        Ok(None) => {}
                        Err(e) => eprintln!("{e}"),
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
            }
        }

        handle.shutdown().await?;
        if let Err(e) = task.await {
            warn!(error = %e, "Notification manager task failed");
        }
        Ok(())
    }

    pub async fn list(&self, unread_only: bool, output: OutputFormat) -> Result<()> {
        let page = self.api()?.list(unread_only).await?;
        match output {
            OutputFormat::Pretty => {
                let sink = TerminalSink::new(self.config.colored);
                let state = inbox::NotificationListState {
                    notifications: page.notifications,
                    unread_count: page.unread_count,
                };
                print!("{}", sink.format_state(&state, Utc::now()));
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
        }
        Ok(())
    }

    pub async fn mark_read(&self, id: &str) -> Result<()> {
        let id = NotificationId::from(id);
        if id.is_empty() {
            return Err(AppError::InvalidInput("notification id must not be empty".into()));
        }

        let response = self.api()?.mark_read(&id).await?;
        if !response.success {
            return Err(AppError::Rejected);
        }
        println!("Marked {id} as read ({} unread)", response.unread_count);
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<()> {
        let response = self.api()?.mark_all_read().await?;
        if !response.success {
            return Err(AppError::Rejected);
        }
        match response.count {
            Some(count) => println!("Marked {count} notifications as read"),
            None => println!("Marked all notifications as read"),
        }
        Ok(())
    }
}

async fn execute(handle: &ManagerHandle, command: WatchCommand) -> Result<()> {
    match command {
        WatchCommand::Read(id) => handle.mark_as_read(id).await?,
        WatchCommand::ReadAll => handle.mark_all_as_read().await?,
        WatchCommand::Open(id) => handle.open_popup(id).await?,
        WatchCommand::Close(id) => handle.dismiss_popup(id).await?,
        WatchCommand::Refresh => handle.refresh().await?,
        WatchCommand::Check => handle.check_now().await?,
        WatchCommand::Hide => handle.set_visibility(Visibility::Hidden).await?,
        WatchCommand::Show => handle.set_visibility(Visibility::Visible).await?,
        WatchCommand::Help => println!("{WATCH_HELP}"),
        WatchCommand::Quit => {}
    }
    Ok(())
}

/// Apply `--mode`/`--interval` on top of the configured mode.
fn resolve_mode(
    configured: AcquisitionMode,
    mode: Option<Mode>,
    interval: Option<u64>,
) -> AcquisitionMode {
    let base = match (mode, configured) {
        (Some(Mode::Polling), AcquisitionMode::Streaming { .. }) => AcquisitionMode::default(),
        (Some(Mode::Streaming), AcquisitionMode::Polling { .. }) => {
            AcquisitionMode::default_streaming()
        }
        _ => configured,
    };
    match (base, interval.map(Duration::from_secs)) {
        (AcquisitionMode::Polling { .. }, Some(interval)) => AcquisitionMode::polling(interval),
        (AcquisitionMode::Streaming { .. }, Some(interval)) => {
            AcquisitionMode::streaming(interval)
        }
        (base, None) => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch_commands() {
        assert_eq!(
            WatchCommand::parse("read 42").unwrap(),
            Some(WatchCommand::Read(NotificationId::from("42")))
        );
        assert_eq!(WatchCommand::parse("  ALL ").unwrap(), Some(WatchCommand::ReadAll));
        assert_eq!(WatchCommand::parse("q").unwrap(), Some(WatchCommand::Quit));
        assert_eq!(WatchCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert!(WatchCommand::parse("open").is_err());
        assert!(WatchCommand::parse("frobnicate 1").is_err());
    }

    #[test]
    fn test_resolve_mode() {
        let polling = AcquisitionMode::polling(Duration::from_secs(30));
        let streaming = AcquisitionMode::streaming(Duration::from_secs(5));

        assert_eq!(resolve_mode(polling, None, None), polling);
        assert_eq!(
            resolve_mode(polling, None, Some(10)),
            AcquisitionMode::polling(Duration::from_secs(10))
        );
        assert_eq!(resolve_mode(polling, Some(Mode::Streaming), None), streaming);
        assert_eq!(
            resolve_mode(streaming, None, Some(2)),
            AcquisitionMode::streaming(Duration::from_secs(2))
        );
        assert_eq!(
            resolve_mode(streaming, Some(Mode::Polling), None),
            AcquisitionMode::default()
        );
    }
}
