pub mod handler;

pub use handler::handle_schema_command;

use clap::Args;

#[derive(Args, Debug)]
pub struct SchemaCommands {
    /// Database id or URL, overriding the config
    #[arg(long)]
    pub database: Option<String>,

    /// Print the raw schema as JSON
    #[arg(long)]
    pub json: bool,
}
