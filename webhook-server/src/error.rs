//! Error types for the webhook server

use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised while starting or stopping the webhook server
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound
    #[error("Failed to bind webhook server on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: warp::Error,
    },

    /// The server task panicked or was cancelled
    #[error("Webhook server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Reasons an inbound request body was not forwarded
///
/// These never change the HTTP answer; they are only logged.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The body is not valid JSON
    #[error("Webhook body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Nobody is consuming events anymore
    #[error("Event receiver has been dropped")]
    ReceiverClosed,
}
