//! Dryer command implementation.
//!
//! Talks to the Klipper API socket on the printer host, not to the NUT
//! server. Shows the drying state of each connected filament hub.

use anyhow::{Context, Result};
use nutmon_core::klippy::{DryerStatus, KlippyClient};
use owo_colors::OwoColorize;

use crate::cli::OutputFormat;
use crate::config::Config;

pub async fn cmd_dryer(
    socket: Option<String>,
    config: &Config,
    format: OutputFormat,
    no_color: bool,
) -> Result<()> {
    let client = match socket.or_else(|| config.klippy_socket.clone()) {
        Some(path) => KlippyClient::new(path),
        None => KlippyClient::default(),
    };

    let ids = client
        .filament_hub_ids()
        .await
        .context("Failed to query filament hubs")?;
    if ids.is_empty() {
        eprintln!("No filament hubs found.");
        return Ok(());
    }

    let mut hubs = Vec::new();
    for id in ids {
        let status = client
            .dryer_status(id)
            .await
            .with_context(|| format!("Failed to query dryer status for hub {id}"))?;
        hubs.push((id, status));
    }

    match format {
        OutputFormat::Json => {
            let out: Vec<serde_json::Value> = hubs
                .iter()
                .map(|(id, status)| serde_json::json!({ "id": id, "dryer": status }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            for (id, status) in &hubs {
                println!("{}", format_dryer_line(*id, status.as_ref(), no_color));
            }
        }
    }
    Ok(())
}

fn format_dryer_line(id: i64, status: Option<&DryerStatus>, no_color: bool) -> String {
    let Some(status) = status else {
        return format!("hub {id}: no dryer");
    };
    let state = if no_color {
        status.status.clone()
    } else if status.status == "drying" {
        status.status.green().to_string()
    } else {
        status.status.yellow().to_string()
    };
    format!(
        "hub {id}: {state} target {:.0}C, {}min set, {}s remaining",
        status.target_temp, status.duration, status.remain_time
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_without_dryer() {
        assert_eq!(format_dryer_line(1, None, true), "hub 1: no dryer");
    }

    #[test]
    fn test_format_line_with_dryer() {
        let status = DryerStatus {
            status: "drying".to_string(),
            target_temp: 45.0,
            duration: 240,
            remain_time: 13303,
        };
        assert_eq!(
            format_dryer_line(0, Some(&status), true),
            "hub 0: drying target 45C, 240min set, 13303s remaining"
        );
    }
}
