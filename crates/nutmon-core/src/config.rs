//! Connection configuration for the NUT session.
//!
//! The daemon address and credentials are an explicit immutable value
//! handed to [`crate::session::UpsSession::connect`], never process-wide
//! state.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default timeout for establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline applied to every blocking read on the session.
///
/// A stalled daemon must never wedge the process; every socket wait in the
/// session is bounded by this.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters for one NUT daemon session.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use nutmon_core::NutConfig;
///
/// let config = NutConfig::new("ups.lan")
///     .port(3493)
///     .credentials("monuser", "secret")
///     .ups_name("workshop")
///     .read_timeout(Duration::from_secs(15));
/// ```
#[derive(Debug, Clone)]
pub struct NutConfig {
    /// Daemon host name or address.
    pub address: String,
    /// Daemon TCP port.
    pub port: u16,
    /// Optional username for the handshake.
    pub username: Option<String>,
    /// Optional password for the handshake.
    pub password: Option<String>,
    /// Pre-selected UPS identifier; discovery runs only when absent.
    pub ups_name: Option<String>,
    /// Timeout for the TCP connect.
    pub connect_timeout: Duration,
    /// Deadline for each blocking read.
    pub read_timeout: Duration,
}

impl Default for NutConfig {
    fn default() -> Self {
        Self::new("localhost")
    }
}

impl NutConfig {
    /// Create a config for the given daemon address with default port and
    /// timeouts and no credentials.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: nutmon_types::proto::DEFAULT_PORT,
            username: None,
            password: None,
            ups_name: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Set the daemon TCP port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set both handshake credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the handshake username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the handshake password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Pre-select a UPS, skipping discovery.
    #[must_use]
    pub fn ups_name(mut self, name: impl Into<String>) -> Self {
        self.ups_name = Some(name.into());
        self
    }

    /// Set the TCP connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-read deadline.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// The `host:port` endpoint string.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(Error::invalid_config("address must not be empty"));
        }
        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err(Error::invalid_config("timeouts must be > 0"));
        }
        Ok(())
    }
}
