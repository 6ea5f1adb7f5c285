//! Wiring of the webhook server, event worker and command dispatcher

use std::net::SocketAddr;
use std::sync::Arc;

use command_client::CommandClient;
use device_registry::DeviceRegistry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use webhook_server::{WebhookPayload, WebhookServer};

use crate::config::RelayConfig;
use crate::dispatch::{CommandDispatcher, CommandSink};
use crate::error::RelayError;
use crate::handler::EventHandler;
use crate::worker::spawn_event_worker;

/// A running relay
///
/// ```text
/// POST /webhook ──► WebhookServer ──► channel ──► event worker ──► EventHandler
///                                                                    │      │
///                                                        DeviceRegistry    CommandSink ──► MicroMDM
/// ```
pub struct Relay {
    registry: DeviceRegistry,
    server: WebhookServer,
    worker: JoinHandle<u64>,
}

impl Relay {
    /// Start a relay that dispatches commands to the configured MicroMDM server
    pub async fn start(config: &RelayConfig) -> Result<Self, RelayError> {
        let client = CommandClient::new(config.server_url.as_str(), config.api_token.clone())?;
        tracing::info!(endpoint = %client.endpoint(), "Dispatching commands to MicroMDM");

        Self::with_sink(config.listen_addr, Arc::new(CommandDispatcher::new(client))).await
    }

    /// Start a relay with a custom command sink
    pub async fn with_sink(
        listen_addr: SocketAddr,
        commands: Arc<dyn CommandSink>,
    ) -> Result<Self, RelayError> {
        let registry = DeviceRegistry::new();
        let handler = Arc::new(EventHandler::new(registry.clone(), commands));

        let (event_tx, event_rx) = mpsc::unbounded_channel::<WebhookPayload>();
        let server = WebhookServer::bind(listen_addr, event_tx).await?;
        let worker = spawn_event_worker(event_rx, handler);

        Ok(Self {
            registry,
            server,
            worker,
        })
    }

    /// Shared handle to the device state
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn webhook_url(&self) -> String {
        self.server.webhook_url()
    }

    /// Stop accepting webhooks, then let the worker drain what was received
    pub async fn shutdown(self) -> Result<(), RelayError> {
        self.server.shutdown().await?;

        // The server owned the only sender, so the worker ends once drained
        let processed = self.worker.await?;

        tracing::info!(
            processed,
            devices = self.registry.len(),
            enrolled = self.registry.enrolled_count(),
            "Relay stopped"
        );
        Ok(())
    }
}
