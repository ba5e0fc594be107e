//! Power-transition actions driven by configured shell commands.

use async_trait::async_trait;
use nutmon_core::PowerActions;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::ActionConfig;

/// Runs the shell command configured for each power transition.
///
/// Commands are fire-and-forget from the monitor's point of view: a hook
/// that fails or is missing is logged and never interrupts polling.
#[derive(Debug, Clone)]
pub struct CommandActions {
    config: ActionConfig,
}

impl CommandActions {
    pub fn new(config: ActionConfig) -> Self {
        Self { config }
    }

    async fn run_hook(&self, name: &str, command: Option<&str>) {
        let Some(command) = command else {
            info!(hook = name, "no command configured, skipping");
            return;
        };
        info!(hook = name, %command, "running transition hook");
        match Command::new("sh").arg("-c").arg(command).status().await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                warn!(hook = name, %status, "transition hook exited with failure");
            }
            Err(e) => {
                warn!(hook = name, error = %e, "failed to spawn transition hook");
            }
        }
    }
}

#[async_trait]
impl PowerActions for CommandActions {
    async fn suspend_print(&self) {
        self.run_hook("suspend_print", self.config.suspend_print.as_deref())
            .await;
    }

    async fn suspend_heater(&self) {
        self.run_hook("suspend_heater", self.config.suspend_heater.as_deref())
            .await;
    }

    async fn resume_heater(&self) {
        self.run_hook("resume_heater", self.config.resume_heater.as_deref())
            .await;
    }

    async fn resume_print(&self) {
        self.run_hook("resume_print", self.config.resume_print.as_deref())
            .await;
    }
}
