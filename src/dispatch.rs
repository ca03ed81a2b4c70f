use log::debug;
use tokio::sync::mpsc;

use crate::codec::ClientCommand;
use crate::error::{ClientError, Result};
use crate::settings::{JobOptions, Settings};
use crate::transport::NamedEvent;

/// Splits free-form URL input into one URL per non-blank line.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turns user intents into outbound commands, one event per intent.
///
/// Nothing is retried or tracked: confirmation, if any, comes back through
/// the normal inbound queue and settings events.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    outbound: mpsc::UnboundedSender<NamedEvent>,
}

impl CommandDispatcher {
    pub fn new(outbound: mpsc::UnboundedSender<NamedEvent>) -> Self {
        Self { outbound }
    }

    pub fn enqueue(&self, urls: Vec<String>, options: JobOptions) -> Result<()> {
        if urls.is_empty() {
            return Err(ClientError::EmptyUrlList);
        }
        self.send(ClientCommand::AddToQueue { urls, options })
    }

    pub fn remove_item(&self, id: &str) -> Result<()> {
        self.send(ClientCommand::RemoveItem { id: id.to_string() })
    }

    pub fn clear_queue(&self) -> Result<()> {
        self.send(ClientCommand::ClearQueue)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.send(ClientCommand::SaveSettings {
            settings: settings.clone(),
        })
    }

    pub fn trigger_tool_update(&self) -> Result<()> {
        self.send(ClientCommand::UpdateTool)
    }

    fn send(&self, command: ClientCommand) -> Result<()> {
        let event = command.encode()?;
        debug!("dispatch: {}", event.name);
        self.outbound
            .send(event)
            .map_err(|_| ClientError::ChannelClosed)
    }
}
