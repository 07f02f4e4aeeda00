//! init-config command handler

use anyhow::Result;
use colored::*;
use std::path::Path;

use super::InitConfigCommands;
use crate::config::{Config, DATABASE_ENV, TOKEN_ENV};

pub async fn handle_init_config_command(
    args: InitConfigCommands,
    config_path: Option<&Path>,
) -> Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path()?,
    };

    Config::write_default(&path, args.force)?;

    println!(
        "Wrote default config to {}",
        path.display().to_string().bright_green()
    );
    println!(
        "Set {} and {} (or edit the file) before running a sync.",
        TOKEN_ENV.bold(),
        DATABASE_ENV.bold()
    );
    Ok(())
}
