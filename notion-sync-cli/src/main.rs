mod api;
mod cli;
mod config;
mod sheet;
mod sync;

use anyhow::Result;
use clap::Parser;

use cli::commands::{init_config, schema, sync as sync_cmd};
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Sync(args) => sync_cmd::handle_sync_command(args, config_path).await,
        Commands::Schema(args) => schema::handle_schema_command(args, config_path).await,
        Commands::InitConfig(args) => {
            init_config::handle_init_config_command(args, config_path).await
        }
    }
}
