//! # mdm-relay
//!
//! Relay between MicroMDM webhook events and per-device command dispatch.
//!
//! MicroMDM posts a JSON event to the relay for every device check-in and
//! command acknowledgement. The relay keeps an in-memory record of each
//! device's enrollment state and, whenever a device sends a token update,
//! asks MicroMDM to queue an `InstalledApplicationList` command for it. The
//! decoded responses to that command are written to the log.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clap::Parser;
//! use mdm_relay::{Args, Relay, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RelayConfig::try_from(Args::parse())?;
//!     let relay = Relay::start(&config).await?;
//!
//!     println!("Webhook URL: {}", relay.webhook_url());
//!
//!     tokio::signal::ctrl_c().await?;
//!     relay.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Components
//!
//! - [`classify`] turns a webhook body into a typed [`Event`]
//! - [`EventHandler`] applies events to the [`DeviceRegistry`]
//! - [`CommandDispatcher`] sends follow-up commands without blocking the handler
//! - [`Relay`] wires these to a [`webhook_server::WebhookServer`]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod logging;
pub mod relay;

mod worker;

pub use config::{Args, RelayConfig, DEFAULT_PORT};
pub use dispatch::{CommandDispatcher, CommandSink};
pub use error::{ConfigError, EventError, RelayError};
pub use event::{classify, Acknowledgement, Event, EventKind};
pub use handler::{EventHandler, Outcome, INSTALLED_APPLICATION_LIST};
pub use logging::{init_logging, LoggingError, LoggingMode};
pub use relay::Relay;

// Re-export the building blocks for callers that wire their own relay
pub use command_client::{Command, CommandClient, CommandError};
pub use device_registry::{Device, DeviceRegistry};
