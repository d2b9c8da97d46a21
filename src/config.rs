//! Device endpoint configuration
//!
//! The device exposes two channels on the same host: a WebSocket stream on
//! port 81 for periodic broadcasts and city pushes, and a plain HTTP port
//! for the `/update` command endpoint.

use std::time::Duration;

use url::Url;

use crate::error::{Result, WxlinkError};
use crate::manual_override::OVERRIDE_WINDOW;

/// Default port for the broadcast stream channel
pub const DEFAULT_STREAM_PORT: u16 = 81;

/// Default port for the `/update` command channel
pub const DEFAULT_COMMAND_PORT: u16 = 80;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for one device
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Device host name or IP address
    pub host: String,

    /// Port the device broadcasts readings on
    pub stream_port: u16,

    /// Port the device accepts `/update` commands on
    pub command_port: u16,

    /// Timeout for a single command request
    pub request_timeout: Duration,

    /// Length of a manual override window
    pub override_window: Duration,
}

impl DeviceConfig {
    /// Create a configuration for the given host with protocol defaults
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            stream_port: DEFAULT_STREAM_PORT,
            command_port: DEFAULT_COMMAND_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            override_window: OVERRIDE_WINDOW,
        }
    }

    /// Override the stream port
    pub fn with_stream_port(mut self, port: u16) -> Self {
        self.stream_port = port;
        self
    }

    /// Override the command port
    pub fn with_command_port(mut self, port: u16) -> Self {
        self.command_port = port;
        self
    }

    /// Override the command request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the manual override window length
    pub fn with_override_window(mut self, window: Duration) -> Self {
        self.override_window = window;
        self
    }

    fn checked_host(&self) -> Result<&str> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(WxlinkError::invalid_endpoint("device host is empty"));
        }
        Ok(host)
    }

    /// URL of the broadcast stream channel
    pub fn stream_url(&self) -> Result<Url> {
        let host = self.checked_host()?;
        Url::parse(&format!("ws://{host}:{}/", self.stream_port))
            .map_err(|e| WxlinkError::invalid_endpoint(format!("{host}: {e}")))
    }

    /// URL of the `/update` command endpoint
    pub fn command_url(&self) -> Result<Url> {
        let host = self.checked_host()?;
        Url::parse(&format!("http://{host}:{}/update", self.command_port))
            .map_err(|e| WxlinkError::invalid_endpoint(format!("{host}: {e}")))
    }
}
