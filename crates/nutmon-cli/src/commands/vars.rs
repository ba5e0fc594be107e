//! Vars command implementation.

use anyhow::{Context, Result};
use nutmon_types::VariableSet;

use crate::cli::{ConnectionArgs, OutputFormat};
use crate::config::{Config, resolve_connection};

use super::open_session;

pub async fn cmd_vars(
    connection: ConnectionArgs,
    config: &Config,
    format: OutputFormat,
    name: Option<String>,
) -> Result<()> {
    let nut_config = resolve_connection(&connection, config);
    let (mut session, ups) = open_session(nut_config).await?;

    if let Some(name) = name {
        let value = session
            .get_var(&ups, &name)
            .await
            .with_context(|| format!("Failed to read {name}"))?;
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ name: value }));
            }
            OutputFormat::Text => println!("{name}: {value}"),
        }
        return Ok(());
    }

    let vars = session
        .list_vars(&ups)
        .await
        .context("Failed to list variables")?;
    print!("{}", format_vars(&vars, format)?);
    Ok(())
}

fn format_vars(vars: &VariableSet, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let map: std::collections::BTreeMap<&str, &str> = vars.iter().collect();
            let mut json = serde_json::to_string_pretty(&map)?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Text => {
            // Stable order for scripting; the daemon's order is arbitrary.
            let mut entries: Vec<_> = vars.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = String::new();
            for (name, value) in entries {
                out.push_str(&format!("{name}: {value}\n"));
            }
            Ok(out)
        }
    }
}
