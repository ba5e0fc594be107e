//! Configuration file management.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use nutmon_core::NutConfig;
use serde::{Deserialize, Serialize};

use crate::cli::ConnectionArgs;

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// NUT server address
    #[serde(default)]
    pub host: Option<String>,

    /// NUT server TCP port
    #[serde(default)]
    pub port: Option<u16>,

    /// Username for the handshake
    #[serde(default)]
    pub username: Option<String>,

    /// Password for the handshake
    #[serde(default)]
    pub password: Option<String>,

    /// UPS name to monitor (skips discovery)
    #[serde(default)]
    pub ups: Option<String>,

    /// Connection and read timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Polling interval in seconds
    #[serde(default)]
    pub interval: Option<u64>,

    /// Battery charge required before resuming (percent)
    #[serde(default)]
    pub resume_threshold: Option<f64>,

    /// Klipper API socket path
    #[serde(default)]
    pub klippy_socket: Option<String>,

    /// Shell commands run on power transitions
    #[serde(default)]
    pub actions: ActionConfig,
}

/// Shell commands run on power transitions.
///
/// Each entry is passed to `sh -c`. Empty entries are skipped, so a config
/// can hook any subset of the four transition points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Run when wall power is lost, before the heater is shut down
    #[serde(default)]
    pub suspend_print: Option<String>,

    /// Run when wall power is lost, after the print is paused
    #[serde(default)]
    pub suspend_heater: Option<String>,

    /// Run when wall power returns and the battery has recovered
    #[serde(default)]
    pub resume_heater: Option<String>,

    /// Run after the heater is restored
    #[serde(default)]
    pub resume_print: Option<String>,
}

impl ActionConfig {
    /// Whether any transition hook is configured.
    pub fn is_empty(&self) -> bool {
        self.suspend_print.is_none()
            && self.suspend_heater.is_none()
            && self.resume_heater.is_none()
            && self.resume_print.is_none()
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nutmon")
            .join("config.toml")
    }

    /// Load config from file, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from a specific path, or return default if not found
    pub fn load_from(path: &PathBuf) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }
}

/// Build a daemon connection config, flags winning over the config file.
///
/// clap already layers env vars under explicit flags, so the effective
/// precedence is flag, then env var, then config file, then default.
pub fn resolve_connection(args: &ConnectionArgs, config: &Config) -> NutConfig {
    let host = args
        .host
        .clone()
        .or_else(|| config.host.clone())
        .unwrap_or_else(|| "localhost".to_string());

    let mut nut = NutConfig::new(host);
    if let Some(port) = args.port.or(config.port) {
        nut = nut.port(port);
    }
    if let Some(username) = args.username.clone().or_else(|| config.username.clone()) {
        nut = nut.username(username);
    }
    if let Some(password) = args.password.clone().or_else(|| config.password.clone()) {
        nut = nut.password(password);
    }
    if let Some(ups) = args.ups.clone().or_else(|| config.ups.clone()) {
        nut = nut.ups_name(ups);
    }
    let timeout = args.timeout.or(config.timeout).unwrap_or(10);
    nut.connect_timeout(Duration::from_secs(timeout))
        .read_timeout(Duration::from_secs(timeout))
}
