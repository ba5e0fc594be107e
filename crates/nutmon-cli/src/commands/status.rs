//! Status command implementation.

use anyhow::{Context, Result};
use nutmon_core::{PowerStatus, Sample, StatusSource};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cli::{ConnectionArgs, OutputFormat};
use crate::config::{Config, resolve_connection};

use super::open_session;

pub async fn cmd_status(
    connection: ConnectionArgs,
    config: &Config,
    format: OutputFormat,
    no_color: bool,
) -> Result<()> {
    let nut_config = resolve_connection(&connection, config);
    let (mut session, ups) = open_session(nut_config).await?;
    let sample = session
        .sample()
        .await
        .context("Failed to read UPS status")?;

    let content = match format {
        OutputFormat::Json => format_status_json(&ups, &sample)?,
        OutputFormat::Text => format_status_text(&ups, &sample, no_color),
    };
    print!("{}", content);
    Ok(())
}

/// Format status as one-line text output with a colored status word
fn format_status_text(ups: &str, sample: &Sample, no_color: bool) -> String {
    let status = sample.status.to_string();
    let status_display = if no_color {
        status
    } else {
        match sample.status {
            PowerStatus::Online => status.green().to_string(),
            PowerStatus::OnBattery => status.red().to_string(),
            PowerStatus::Unknown => status.yellow().to_string(),
        }
    };
    let name_display = if no_color {
        ups.to_string()
    } else {
        ups.cyan().to_string()
    };
    match sample.charge() {
        Some(charge) => format!("{}: {} ({:.0}% charge)\n", name_display, status_display, charge),
        None => format!("{}: {}\n", name_display, status_display),
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    ups: &'a str,
    status: String,
    raw_status: &'a str,
    charge: Option<f64>,
}

fn format_status_json(ups: &str, sample: &Sample) -> Result<String> {
    let out = StatusJson {
        ups,
        status: sample.status.to_string(),
        raw_status: &sample.raw_status,
        charge: sample.charge(),
    };
    let mut json = serde_json::to_string_pretty(&out)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: &str, charge: &str) -> Sample {
        Sample::from_raw(status.to_string(), charge.to_string())
    }

    #[test]
    fn test_text_includes_charge_when_parsable() {
        let line = format_status_text("workshop", &sample("OL", "87"), true);
        assert_eq!(line, "workshop: Online (87% charge)\n");
    }

    #[test]
    fn test_text_omits_unparsable_charge() {
        let line = format_status_text("workshop", &sample("OB", "n/a"), true);
        assert_eq!(line, "workshop: On Battery\n");
    }

    #[test]
    fn test_json_carries_raw_status() {
        let json = format_status_json("workshop", &sample("OB LB", "12.5")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "On Battery");
        assert_eq!(value["raw_status"], "OB LB");
        assert_eq!(value["charge"], 12.5);
    }
}
