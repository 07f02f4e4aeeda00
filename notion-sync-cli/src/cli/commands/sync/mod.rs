pub mod handler;

pub use handler::handle_sync_command;

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SyncCommands {
    /// CSV or XLSX file to read rows from
    pub source: PathBuf,

    /// Worksheet to use (XLSX only; defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Build payloads without writing to Notion or the sheet
    #[arg(long)]
    pub dry_run: bool,

    /// Skip importing thumbnails into Notion storage
    #[arg(long)]
    pub no_file_import: bool,

    /// Database id or URL, overriding the config
    #[arg(long)]
    pub database: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
