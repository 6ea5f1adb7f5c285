//! HTTP listener for MicroMDM webhook notifications.
//!
//! This crate provides a lightweight HTTP server that MicroMDM can be pointed
//! at with its `-command-webhook-url` flag. It knows nothing about MDM topics;
//! it only acknowledges requests and hands parsed JSON bodies to a channel.
//!
//! # Overview
//!
//! - [`WebhookServer`]: binds a local address and serves `POST /webhook` and
//!   `GET /health`.
//! - [`EventRouter`]: parses request bodies and forwards them to a channel.
//! - [`WebhookPayload`]: a parsed JSON body plus the sender's address.
//!
//! # Acknowledgement Contract
//!
//! Every `POST /webhook` is answered with `200 OK` and an empty body, whether
//! the body parsed or not and whether anything is still consuming events.
//! Processing happens after the reply, on the receiving end of the channel.
//!
//! # Example
//!
//! ```no_run
//! use webhook_server::{WebhookPayload, WebhookServer};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), webhook_server::ServerError> {
//!     let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();
//!     let server = WebhookServer::bind(([127, 0, 0, 1], 0).into(), tx).await?;
//!
//!     tokio::spawn(async move {
//!         while let Some(payload) = rx.recv().await {
//!             println!("topic: {}", payload.event["topic"]);
//!         }
//!     });
//!
//!     server.shutdown().await
//! }
//! ```

mod error;
pub mod router;
mod server;

pub use error::{RouteError, ServerError};
pub use router::{EventRouter, WebhookPayload};
pub use server::{WebhookServer, HEALTH_PATH, WEBHOOK_PATH};
