//! Event routing for webhook notifications.
//!
//! This module provides the `EventRouter` which parses incoming webhook bodies
//! and forwards them to a channel for processing.

use std::net::SocketAddr;
use tokio::sync::mpsc;

use crate::error::RouteError;

/// A webhook notification that has been parsed as JSON.
///
/// The body is kept as a generic JSON value; interpreting topics and nested
/// event data is left to the consumer.
#[derive(Debug, Clone)]
pub struct WebhookPayload {
    /// The parsed request body
    pub event: serde_json::Value,
    /// Peer address of the sender, when the transport exposes it
    pub remote_addr: Option<SocketAddr>,
}

/// Routes webhook bodies from HTTP requests to a channel.
///
/// Routing never blocks: the channel is unbounded, so the HTTP layer can
/// acknowledge the request as soon as `route_event` returns.
#[derive(Debug, Clone)]
pub struct EventRouter {
    /// Channel for sending parsed payloads
    event_sender: mpsc::UnboundedSender<WebhookPayload>,
}

impl EventRouter {
    /// Create a new event router.
    ///
    /// # Example
    ///
    /// ```
    /// use tokio::sync::mpsc;
    /// use webhook_server::router::{EventRouter, WebhookPayload};
    ///
    /// let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();
    /// let router = EventRouter::new(tx);
    /// ```
    pub fn new(event_sender: mpsc::UnboundedSender<WebhookPayload>) -> Self {
        Self { event_sender }
    }

    /// Parse a request body and send it to the channel.
    ///
    /// # Example
    ///
    /// ```
    /// # use tokio::sync::mpsc;
    /// # use webhook_server::router::{EventRouter, WebhookPayload};
    /// # let (tx, mut rx) = mpsc::unbounded_channel::<WebhookPayload>();
    /// # let router = EventRouter::new(tx);
    /// router.route_event(br#"{"topic":"mdm.Connect"}"#, None).unwrap();
    /// assert_eq!(rx.try_recv().unwrap().event["topic"], "mdm.Connect");
    /// ```
    pub fn route_event(
        &self,
        body: &[u8],
        remote_addr: Option<SocketAddr>,
    ) -> Result<(), RouteError> {
        let event = serde_json::from_slice(body)?;

        self.event_sender
            .send(WebhookPayload { event, remote_addr })
            .map_err(|_| RouteError::ReceiverClosed)
    }
}
