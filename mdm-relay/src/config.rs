//! Command line and environment configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;
use url::Url;

use crate::error::ConfigError;
use crate::logging::LoggingMode;

/// Port the webhook listener uses when none is given
pub const DEFAULT_PORT: u16 = 80;

/// MicroMDM webhook relay
///
/// Receives MicroMDM webhook events on `POST /webhook`, tracks device
/// enrollment, and requests the installed application list from every device
/// that sends a token update.
#[derive(Parser, Debug)]
#[command(name = "mdm-relay", version, about)]
pub struct Args {
    /// Public HTTPS URL of your MicroMDM server
    #[arg(env = "MDM_RELAY_SERVER_URL")]
    pub server_url: Option<String>,

    /// API token for your MicroMDM server
    #[arg(env = "MDM_RELAY_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Port for the webhook server to listen on
    #[arg(short, long, env = "MDM_RELAY_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address for the webhook server to bind to
    #[arg(long, env = "MDM_RELAY_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Log output style
    #[arg(long, env = "MDM_RELAY_LOG_MODE", value_enum, default_value_t = LoggingMode::Development)]
    pub log_mode: LoggingMode,
}

/// Validated relay configuration, fixed for the life of the process
#[derive(Clone)]
pub struct RelayConfig {
    pub server_url: Url,
    pub api_token: String,
    pub listen_addr: SocketAddr,
    pub log_mode: LoggingMode,
}

impl TryFrom<Args> for RelayConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let raw_url = args
            .server_url
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::MissingServerUrl)?;
        let server_url = parse_server_url(&raw_url)?;

        let api_token = args
            .api_token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingApiToken)?;

        Ok(Self {
            server_url,
            api_token,
            listen_addr: SocketAddr::new(args.bind, args.port),
            log_mode: args.log_mode,
        })
    }
}

impl RelayConfig {
    /// Log the effective configuration, without the token
    pub fn log_summary(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  MicroMDM server: {}", self.server_url);
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Log mode: {:?}", self.log_mode);
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("server_url", &self.server_url.as_str())
            .field("api_token", &"<redacted>")
            .field("listen_addr", &self.listen_addr)
            .field("log_mode", &self.log_mode)
            .finish()
    }
}

fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidServerUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim().trim_end_matches('/')).map_err(|e| invalid(e.to_string()))?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err(invalid("missing host".to_string())),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}
