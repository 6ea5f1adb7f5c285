//! Private command client for MicroMDM servers
//!
//! This crate provides a minimal HTTP client for queueing MDM commands via the
//! server's `/v1/commands` API. It authenticates with HTTP Basic auth using the
//! fixed `micromdm` user name and the server's API token.
//!
//! The client sends one request per call and does not read or interpret the
//! response body; callers decide what to do with the returned status.

mod error;

pub use error::CommandError;
pub use reqwest::StatusCode;

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use url::Url;

/// User name MicroMDM expects for API Basic auth
pub const API_USERNAME: &str = "micromdm";

/// Path of the command queueing endpoint, relative to the server URL
pub const COMMANDS_PATH: &str = "/v1/commands";

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A command to queue for a single device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    /// Target device UDID
    pub udid: String,
    /// MDM request type, e.g. `InstalledApplicationList`
    pub request_type: String,
}

impl Command {
    /// Create a new command for a device
    pub fn new(udid: impl Into<String>, request_type: impl Into<String>) -> Self {
        Self {
            udid: udid.into(),
            request_type: request_type.into(),
        }
    }
}

/// A minimal client for the MicroMDM command API
#[derive(Clone)]
pub struct CommandClient {
    http: reqwest::Client,
    endpoint: Url,
    api_token: String,
}

impl CommandClient {
    /// Create a new client with default timeouts
    ///
    /// Trailing slashes on `server_url` are ignored, so both
    /// `https://mdm.example.com` and `https://mdm.example.com/` resolve to
    /// `https://mdm.example.com/v1/commands`.
    pub fn new(server_url: &str, api_token: impl Into<String>) -> Result<Self, CommandError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            endpoint: Self::commands_endpoint(server_url)?,
            api_token: api_token.into(),
        })
    }

    /// The full URL commands are posted to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Queue a command on the server
    ///
    /// Returns the HTTP status of the response for any answer the server gives,
    /// including error statuses. Only transport failures (connection refused,
    /// timeouts, TLS errors) are reported as `Err`.
    pub async fn send(&self, command: &Command) -> Result<StatusCode, CommandError> {
        let body = serde_json::to_vec(command)?;

        let response = self
            .http
            .post(self.endpoint.clone())
            .basic_auth(API_USERNAME, Some(&self.api_token))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        Ok(response.status())
    }

    fn commands_endpoint(server_url: &str) -> Result<Url, CommandError> {
        let invalid = |reason: String| CommandError::InvalidServerUrl {
            url: server_url.to_string(),
            reason,
        };

        let base = server_url.trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}{COMMANDS_PATH}"))
            .map_err(|e| invalid(e.to_string()))?;

        match endpoint.scheme() {
            "http" | "https" => Ok(endpoint),
            other => Err(invalid(format!("unsupported scheme '{other}'"))),
        }
    }
}

impl std::fmt::Debug for CommandClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_token", &"<redacted>")
            .finish()
    }
}
