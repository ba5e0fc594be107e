//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Reaction to a failed poll tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FailureMode {
    /// Exit on the first failed tick
    #[default]
    Stop,
    /// Log the failure and keep polling
    Continue,
    /// Re-dial the server when the session is lost
    Reconnect,
}

/// Reusable NUT server connection arguments
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// NUT server address, or use NUTMON_HOST env var
    #[arg(short = 'H', long, env = "NUTMON_HOST")]
    pub host: Option<String>,

    /// NUT server TCP port
    #[arg(short = 'P', long, env = "NUTMON_PORT")]
    pub port: Option<u16>,

    /// Username for the handshake, or use NUTMON_USERNAME env var
    #[arg(short, long, env = "NUTMON_USERNAME")]
    pub username: Option<String>,

    /// Password for the handshake, or use NUTMON_PASSWORD env var
    #[arg(short, long, env = "NUTMON_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// UPS name to monitor (skips discovery)
    #[arg(short = 'U', long, env = "NUTMON_UPS")]
    pub ups: Option<String>,

    /// Connection timeout in seconds [default: 10]
    #[arg(short = 'T', long, env = "NUTMON_TIMEOUT")]
    pub timeout: Option<u64>,
}

#[derive(Parser)]
#[command(name = "nutmon")]
#[command(author, version, about = "UPS monitor for NUT servers", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Monitor the UPS and react to power transitions
    Run {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Polling interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,

        /// Battery charge required before resuming (percent)
        #[arg(short, long)]
        resume_threshold: Option<f64>,

        /// Reaction to a failed poll tick
        #[arg(long, value_enum, default_value = "stop")]
        on_failure: FailureMode,
    },

    /// Show a one-line power status snapshot
    Status {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Dump all variables reported by the UPS
    Vars {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Show only this variable
        #[arg(short = 'n', long)]
        name: Option<String>,
    },

    /// Enumerate the UPS devices the server knows about
    ListUps {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Query filament-hub dryer status over the Klipper API socket
    #[cfg(unix)]
    Dryer {
        /// Klipper API socket path
        #[arg(short, long)]
        socket: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}
