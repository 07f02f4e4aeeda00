//! Sync command handler

use anyhow::{Context, Result};
use colored::*;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;

use super::SyncCommands;
use crate::api::NotionClient;
use crate::config::{Config, RunOverrides};
use crate::sheet::open_source;
use crate::sync::{RowStatus, SyncReport, SyncRunner};

/// Run a full sync of one sheet
pub async fn handle_sync_command(args: SyncCommands, config_path: Option<&Path>) -> Result<()> {
    if args.no_color {
        colored::control::set_override(false);
    }

    if !args.source.exists() {
        anyhow::bail!("Source file does not exist: {}", args.source.display());
    }

    let config = Config::load(config_path)?;
    let overrides = RunOverrides {
        database_id: args.database.clone(),
        dry_run: args.dry_run,
        no_file_import: args.no_file_import,
    };
    let sync_config = config.to_sync_config(&overrides)?;
    let resilience = config.resilience();
    let credentials = config.credentials()?;
    let client = NotionClient::new(
        &credentials.token,
        &credentials.api_version,
        &credentials.base_url,
    )?;

    let mut store = open_source(&args.source, args.sheet.as_deref())
        .with_context(|| format!("Failed to open {}", args.source.display()))?;

    println!(
        "Syncing {} into database {}",
        args.source.display().to_string().cyan(),
        sync_config.database_id.bright_green()
    );
    if sync_config.dry_run {
        println!("{}", "Dry run: nothing will be written".yellow());
    }

    let start = Instant::now();
    let report = SyncRunner::new(&client, &sync_config, &resilience)
        .run(store.as_mut())
        .await
        .context("Sync failed")?;

    print_report(&report)?;
    println!("Elapsed: {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}

fn print_report(report: &SyncReport) -> Result<()> {
    for column in &report.unresolved {
        println!("{} {}", "ignored:".yellow(), column);
    }

    if report.dry_run {
        for outcome in &report.outcomes {
            if let RowStatus::Planned { properties, cover } = &outcome.status {
                println!();
                println!("Row {} ({})", outcome.row_number, outcome.key.bold());
                let payload = serde_json::to_string_pretty(&Value::Object(properties.clone()))
                    .context("Failed to format properties")?;
                println!("{}", payload.dimmed());
                if let Some(cover) = cover {
                    println!("cover: {}", cover.cyan());
                }
            }
        }
        println!();
    }

    for outcome in report.failures() {
        if let RowStatus::Failed { error } = &outcome.status {
            println!(
                "{} row {} ({}): {}",
                "failed:".red().bold(),
                outcome.row_number,
                outcome.key,
                error
            );
        }
    }

    let summary = report.summary();
    let line = summary.to_string();
    if summary.failed > 0 {
        println!("{}", line.red().bold());
    } else {
        println!("{}", line.green().bold());
    }
    Ok(())
}
