//! Core library for monitoring a UPS through a NUT (Network UPS Tools) server.
//!
//! This crate implements the client side of the NUT line protocol plus the
//! monitoring loop built on top of it:
//!
//! - **Session**: TCP connection, authentication, UPS discovery and selection
//! - **Variables**: `LIST VAR` snapshots and single `GET VAR` queries
//! - **Monitoring**: a fixed-interval poll loop with edge-triggered power
//!   actions (suspend on wall-power loss, resume once the battery recovers)
//! - **Events**: a broadcast channel describing what the monitor observed
//! - **Klipper** (unix only): a one-shot JSON-RPC client for the Klipper API
//!   socket, used to reach filament-hub dryers on the same printer
//!
//! # Quick Start
//!
//! ```no_run
//! use nutmon_core::{NutConfig, PollOptions, UpsMonitor, UpsSession, NoopActions};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NutConfig::new("localhost").credentials("monuser", "secret");
//!
//!     let mut session = UpsSession::connect(config).await?;
//!     session.authenticate().await?;
//!     let ups = session.select_ups().await?;
//!     println!("monitoring {ups}");
//!
//!     let monitor = UpsMonitor::new(session, NoopActions, PollOptions::default())?;
//!     monitor.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod config;
pub mod error;
pub mod events;
#[cfg(unix)]
pub mod klippy;
pub mod mock;
pub mod monitor;
pub mod reader;
pub mod session;
pub mod traits;

// Core exports
pub use actions::{NoopActions, PowerActions};
pub use config::NutConfig;
pub use error::{AuthFailure, Error, Result};
pub use events::{EventDispatcher, EventReceiver, EventSender, MonitorEvent};
pub use monitor::{FailurePolicy, PollOptions, PollOptionsBuilder, UpsMonitor};
pub use reader::LineReader;
pub use session::UpsSession;
pub use traits::StatusSource;

// Re-export from nutmon-types
pub use nutmon_types::{PowerStatus, Sample, UpsEntry, VariableSet};
