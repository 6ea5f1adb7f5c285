//! Error types for the command client

use thiserror::Error;

/// Errors that can occur while talking to the MDM server
#[derive(Debug, Error)]
pub enum CommandError {
    /// The configured server URL cannot be used as a base for `/v1/commands`
    #[error("Invalid server URL '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },

    /// The command could not be serialized
    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    /// Network or HTTP transport failure
    #[error("Network/HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
}
