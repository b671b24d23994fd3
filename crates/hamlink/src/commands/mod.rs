//! Command dispatch: bridges CLI args -> querier operations -> output formatting.

pub mod bgp;
pub mod cache;
pub mod config_cmd;
pub mod device;
pub mod link;
pub mod sweep;
pub mod util;

use hamlink_config::Config;
use hamlink_core::Querier;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    querier: &Querier,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::System(args) => device::system(querier, args, global).await,
        Command::Interfaces(args) => device::interfaces(querier, args, global).await,
        Command::Peers(args) => device::peers(querier, args, global).await,
        Command::Link(args) => link::handle(querier, args, global).await,
        Command::Bgp(args) => bgp::handle(querier, args, global).await,
        Command::Cache(args) => cache::handle(querier, args, global),
        Command::Sweep(args) => sweep::handle(querier, cfg, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}
