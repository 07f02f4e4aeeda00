pub mod handler;

pub use handler::handle_init_config_command;

use clap::Args;

#[derive(Args, Debug)]
pub struct InitConfigCommands {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}
