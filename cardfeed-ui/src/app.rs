//! Command loop
//!
//! The single task that owns the manager. User commands and inbound
//! manager messages are taken one at a time, so no handler ever runs
//! concurrently with another.

use std::str::FromStr;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::manager::EventStreamManager;
use crate::pdf::{PdfLauncher, PdfViewer};
use crate::sink::RenderSink;

pub const OTHER_ACTION_ALERT: &str = "Another action triggered!";
pub const YET_ANOTHER_ACTION_ALERT: &str = "Yet another action!";

/// A user action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    RequestCard,
    EnableStream,
    DisableStream,
    GeneratePdf,
    OtherAction,
    YetAnotherAction,
    Quit,
}

impl UiCommand {
    /// One-line usage summary of the text commands
    pub const HELP: &'static str =
        "commands: card | enable | disable | pdf | other | yet-another | quit";
}

impl FromStr for UiCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" | "button" | "c" => Ok(UiCommand::RequestCard),
            "enable" | "on" | "e" => Ok(UiCommand::EnableStream),
            "disable" | "off" | "d" => Ok(UiCommand::DisableStream),
            "pdf" | "p" => Ok(UiCommand::GeneratePdf),
            "other" => Ok(UiCommand::OtherAction),
            "yet-another" | "yet_another" => Ok(UiCommand::YetAnotherAction),
            "quit" | "exit" | "q" => Ok(UiCommand::Quit),
            other => Err(format!("Unknown command '{}' ({})", other, UiCommand::HELP)),
        }
    }
}

/// Drive the manager until `Quit` arrives or the command channel closes
pub async fn run<S, V>(
    manager: &mut EventStreamManager<S>,
    launcher: &mut PdfLauncher<V>,
    commands: &mut mpsc::Receiver<UiCommand>,
) where
    S: RenderSink,
    V: PdfViewer,
{
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("Command channel closed");
                    break;
                };
                if command == UiCommand::Quit {
                    break;
                }
                execute(manager, launcher, command).await;
            }
            Some(inbound) = manager.recv_inbound() => {
                manager.handle_inbound(inbound).await;
            }
        }
    }

    info!("Command loop stopped");
}

/// Run one user command
pub async fn execute<S, V>(
    manager: &mut EventStreamManager<S>,
    launcher: &mut PdfLauncher<V>,
    command: UiCommand,
) where
    S: RenderSink,
    V: PdfViewer,
{
    debug!("Executing {:?}", command);

    match command {
        UiCommand::RequestCard => {
            manager.request_card_by_action().await;
        }
        UiCommand::EnableStream => {
            manager.enable_stream();
        }
        UiCommand::DisableStream => {
            manager.disable_stream();
        }
        UiCommand::GeneratePdf => {
            launcher.generate(manager.sink_mut()).await;
        }
        UiCommand::OtherAction => manager.sink_mut().alert(OTHER_ACTION_ALERT),
        UiCommand::YetAnotherAction => manager.sink_mut().alert(YET_ANOTHER_ACTION_ALERT),
        UiCommand::Quit => {}
    }
}
