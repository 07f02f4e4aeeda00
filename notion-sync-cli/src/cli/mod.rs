//! Command-line interface

pub mod commands;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use commands::init_config::InitConfigCommands;
use commands::schema::SchemaCommands;
use commands::sync::SyncCommands;

#[derive(Parser, Debug)]
#[command(name = "notion-sync")]
#[command(about = "Upsert spreadsheet rows into a Notion database")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ~/.config/notion-sync/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync every row of a CSV or XLSX sheet into the database
    Sync(SyncCommands),
    /// Show the properties of the target database
    Schema(SchemaCommands),
    /// Write a default config file
    InitConfig(InitConfigCommands),
}

impl Cli {
    /// Log level implied by the verbosity flags
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
