//! Outbound command dispatch
//!
//! Dispatch is fire-and-forget: each command is sent once from a background
//! task, transport failures are logged, and nothing is retried. Delivery is
//! at most once. The event path that triggered a command never waits for it
//! and never sees its outcome.

use command_client::{Command, CommandClient};
use tokio::runtime::Handle;

/// Something that accepts commands for delivery to the MDM server
///
/// `dispatch` must return promptly and must not fail from the caller's point
/// of view; whatever happens to the command afterwards is the sink's concern.
pub trait CommandSink: Send + Sync {
    fn dispatch(&self, command: Command);
}

/// Sends commands to MicroMDM through a [`CommandClient`]
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    client: CommandClient,
}

impl CommandDispatcher {
    pub fn new(client: CommandClient) -> Self {
        Self { client }
    }
}

impl CommandSink for CommandDispatcher {
    fn dispatch(&self, command: Command) {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::error!(
                    udid = %command.udid,
                    request_type = %command.request_type,
                    "No async runtime available, dropping command"
                );
                return;
            }
        };

        let client = self.client.clone();
        runtime.spawn(async move {
            deliver(&client, &command).await;
        });
    }
}

/// A sink that keeps every command it is given.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    commands: std::sync::Mutex<Vec<Command>>,
}

#[cfg(test)]
impl RecordingSink {
    pub(crate) fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl CommandSink for RecordingSink {
    fn dispatch(&self, command: Command) {
        self.commands.lock().unwrap().push(command);
    }
}

async fn deliver(client: &CommandClient, command: &Command) {
    match client.send(command).await {
        Ok(status) => {
            tracing::debug!(
                udid = %command.udid,
                request_type = %command.request_type,
                %status,
                "Command sent"
            );
        }
        Err(e) => {
            tracing::warn!(
                udid = %command.udid,
                request_type = %command.request_type,
                "Failed to send command: {}",
                e
            );
        }
    }
}
