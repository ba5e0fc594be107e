//! List-ups command implementation.

use anyhow::{Context, Result};
use nutmon_core::UpsSession;
use nutmon_types::UpsEntry;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cli::{ConnectionArgs, OutputFormat};
use crate::config::{Config, resolve_connection};

pub async fn cmd_list_ups(
    connection: ConnectionArgs,
    config: &Config,
    format: OutputFormat,
    no_color: bool,
) -> Result<()> {
    let nut_config = resolve_connection(&connection, config);
    // Enumeration does not need a selected UPS, only an authenticated session.
    let mut session = UpsSession::connect(nut_config)
        .await
        .context("Failed to connect to NUT server")?;
    session
        .authenticate()
        .await
        .context("Authentication failed")?;
    let entries = session.list_ups().await.context("Failed to list UPSes")?;

    match format {
        OutputFormat::Json => {
            let out: Vec<UpsJson<'_>> = entries.iter().map(UpsJson::from).collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            if entries.is_empty() {
                eprintln!("No UPS devices found.");
                return Ok(());
            }
            for entry in &entries {
                let name = if no_color {
                    entry.name.clone()
                } else {
                    entry.name.cyan().to_string()
                };
                println!("{}  {}", name, entry.description);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct UpsJson<'a> {
    name: &'a str,
    description: &'a str,
}

impl<'a> From<&'a UpsEntry> for UpsJson<'a> {
    fn from(entry: &'a UpsEntry) -> Self {
        Self {
            name: &entry.name,
            description: &entry.description,
        }
    }
}
