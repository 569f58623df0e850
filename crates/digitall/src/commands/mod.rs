//! Command dispatch: bridges CLI args -> core resolver -> output formatting.

pub mod config_cmd;
pub mod export;
pub mod status;
pub mod util;
pub mod validate;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a subscription-bound command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(args, global).await,
        Command::Validate(args) => validate::handle(args, global).await,
        Command::Export(args) => export::handle(args, global).await,
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        // Completions are handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}
