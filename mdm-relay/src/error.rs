//! Error types for mdm-relay

use thiserror::Error;

/// Errors raised while classifying or applying a webhook event
///
/// These are always recovered locally: the event is logged and dropped, and
/// the registry is left untouched.
#[derive(Debug, Error)]
pub enum EventError {
    /// A recognized topic is missing the nested data it requires
    #[error("Malformed {topic} payload: {reason}")]
    MalformedPayload { topic: &'static str, reason: String },
}

impl EventError {
    pub(crate) fn malformed(topic: &'static str, reason: impl Into<String>) -> Self {
        EventError::MalformedPayload {
            topic,
            reason: reason.into(),
        }
    }
}

/// Invalid or missing startup configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MicroMDM server URL is required")]
    MissingServerUrl,

    #[error("Invalid MicroMDM server URL '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("MicroMDM API token is required")]
    MissingApiToken,
}

/// Errors raised while starting or stopping the relay
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Server(#[from] webhook_server::ServerError),

    #[error(transparent)]
    Client(#[from] command_client::CommandError),

    #[error("Event worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
