//! Command dispatch: bridges CLI args -> gateway services -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod router;
pub mod schedule;
pub mod util;

use homegate_core::Gateway;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a gateway-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    gateway: &Gateway,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Check => router::check(gateway, global).await,
        Command::Status => router::status(gateway, global).await,
        Command::Restart => router::restart(gateway, global).await,
        Command::Login => router::login(gateway, profile, global).await,
        Command::Logout => router::logout(gateway, global).await,
        Command::Advice => router::advice(gateway, global).await,
        Command::Devices(args) => devices::handle(gateway, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
