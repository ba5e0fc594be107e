//! Run command implementation.
//!
//! Long-running monitor mode: poll the UPS on a fixed interval and fire
//! the configured transition hooks when the power status crosses an edge.
//! Runs until cancelled by a signal or stopped by the failure policy.

use std::time::Duration;

use anyhow::Result;
use nutmon_core::{FailurePolicy, MonitorEvent, PollOptions, UpsMonitor};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::actions::CommandActions;
use crate::cli::{ConnectionArgs, FailureMode};
use crate::config::{Config, resolve_connection};

use super::open_session;

/// Backoff between reconnect attempts after a session-fatal failure.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
/// Reconnect attempts before giving up on the server.
const RECONNECT_ATTEMPTS: u32 = 12;

/// Arguments for the run command.
pub struct RunArgs {
    pub connection: ConnectionArgs,
    pub interval: Option<u64>,
    pub resume_threshold: Option<f64>,
    pub on_failure: FailureMode,
}

pub async fn cmd_run(args: RunArgs, config: &Config, cancel: CancellationToken) -> Result<()> {
    let nut_config = resolve_connection(&args.connection, config);
    let (session, ups) = open_session(nut_config).await?;
    info!(%ups, endpoint = session.endpoint(), "monitoring UPS");

    if config.actions.is_empty() {
        warn!("no transition hooks configured; power edges will only be logged");
    }

    #[cfg(unix)]
    probe_dryers(config).await;

    let policy = match args.on_failure {
        FailureMode::Stop => FailurePolicy::Stop,
        FailureMode::Continue => FailurePolicy::Continue {
            max_consecutive: None,
        },
        FailureMode::Reconnect => FailurePolicy::Reconnect {
            max_attempts: RECONNECT_ATTEMPTS,
            delay: RECONNECT_DELAY,
        },
    };
    let mut options = PollOptions::builder().failure_policy(policy);
    if let Some(secs) = args.interval.or(config.interval) {
        options = options.interval(Duration::from_secs(secs));
    }
    if let Some(threshold) = args.resume_threshold.or(config.resume_threshold) {
        options = options.resume_threshold(threshold);
    }

    let actions = CommandActions::new(config.actions.clone());
    let monitor = UpsMonitor::new(session, actions, options.build())?;
    monitor.events().send(MonitorEvent::UpsSelected { name: ups });
    monitor.run(cancel).await?;

    info!("monitor stopped");
    Ok(())
}

/// Log the filament-hub dryer state once at startup, if a Klipper socket
/// is configured. Failures here never block monitoring.
#[cfg(unix)]
async fn probe_dryers(config: &Config) {
    use nutmon_core::klippy::KlippyClient;

    let Some(path) = &config.klippy_socket else {
        return;
    };
    let client = KlippyClient::new(path);
    match client.filament_hub_ids().await {
        Ok(ids) if ids.is_empty() => info!("no filament hubs connected"),
        Ok(ids) => {
            for id in ids {
                match client.dryer_status(id).await {
                    Ok(Some(status)) => info!(
                        hub = id,
                        state = %status.status,
                        remain_secs = status.remain_time,
                        "filament hub dryer"
                    ),
                    Ok(None) => info!(hub = id, "filament hub has no dryer"),
                    Err(error) => warn!(hub = id, %error, "dryer status query failed"),
                }
            }
        }
        Err(error) => warn!(%error, "filament hub probe failed"),
    }
}
