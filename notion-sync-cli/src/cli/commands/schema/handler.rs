//! Schema command handler

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use super::SchemaCommands;
use crate::api::{DatabaseSchema, NotionClient, fetch_schema};
use crate::config::Config;

/// Print the database properties and how the configured columns map onto them
pub async fn handle_schema_command(args: SchemaCommands, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let database_id = config.database_id(args.database.as_deref())?;
    let credentials = config.credentials()?;
    let client = NotionClient::new(
        &credentials.token,
        &credentials.api_version,
        &credentials.base_url,
    )?;

    let schema = fetch_schema(&client, &database_id).await?;

    if args.json {
        let text = serde_json::to_string_pretty(&schema).context("Failed to format schema")?;
        println!("{}", text);
        return Ok(());
    }

    println!("Database {}", database_id.bright_green());
    println!();
    print_properties(&schema);
    println!();
    print_mappings(&config, &schema);
    Ok(())
}

fn print_properties(schema: &DatabaseSchema) {
    let width = schema.properties.keys().map(|k| k.len()).max().unwrap_or(0);
    for (name, ty) in &schema.properties {
        let label = format!("{:width$}", name, width = width);
        if *name == schema.title_property {
            println!("  {}  {}", label.bold(), ty.to_string().cyan());
        } else {
            println!("  {}  {}", label, ty.to_string().cyan());
        }
    }
}

fn print_mappings(config: &Config, schema: &DatabaseSchema) {
    println!("Column mappings:");
    for mapping in &config.columns {
        let property = mapping.target_property(&schema.title_property);
        match schema.property_type(property) {
            Some(ty) => println!(
                "  {} → {} ({}, {})",
                mapping.header,
                property,
                ty.to_string().cyan(),
                mapping.rule.label()
            ),
            None => println!(
                "  {} → {} {}",
                mapping.header,
                property,
                "not in database".red()
            ),
        }
    }
}
