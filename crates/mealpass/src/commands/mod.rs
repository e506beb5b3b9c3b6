//! Command dispatch: bridges CLI args -> engine calls -> output formatting.

pub mod codes;
pub mod config_cmd;
pub mod counter;
pub mod hours;
pub mod log;
pub mod students;
pub mod util;
pub mod verify;

use crate::cli::{Command, GlobalOpts};
use crate::config::Engine;
use crate::error::CliError;

/// Dispatch a store-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Verify(args) => verify::handle(engine, args, global).await,
        Command::Codes(args) => codes::handle(engine, args, global).await,
        Command::Students(args) => students::handle(engine, args, global).await,
        Command::Log(args) => log::handle(engine, args, global).await,
        Command::Hours => hours::handle(engine, global),
        Command::Counter => counter::handle(engine, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions do not open the record store".into(),
        )),
    }
}
