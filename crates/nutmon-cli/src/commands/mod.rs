//! Command implementations for the CLI.

mod list_ups;
mod run;
mod status;
mod vars;

#[cfg(unix)]
mod dryer;

pub use list_ups::cmd_list_ups;
pub use run::{RunArgs, cmd_run};
pub use status::cmd_status;
pub use vars::cmd_vars;

#[cfg(unix)]
pub use dryer::cmd_dryer;

use anyhow::{Context, Result};
use nutmon_core::{NutConfig, UpsSession};

/// Connect, authenticate, and select a UPS.
///
/// Every command starts the same way; discovery only runs when the config
/// did not pin a UPS name.
pub(crate) async fn open_session(config: NutConfig) -> Result<(UpsSession, String)> {
    let mut session = UpsSession::connect(config)
        .await
        .context("Failed to connect to NUT server")?;
    session
        .authenticate()
        .await
        .context("Authentication failed")?;
    let ups = session.select_ups().await.context("No UPS available")?;
    Ok((session, ups))
}
