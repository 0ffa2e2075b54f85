//! Command dispatch: bridges CLI args -> core orchestration -> output formatting.

pub mod apply;
pub mod config_cmd;
pub mod outputs;
pub mod plan;
pub mod state;
pub mod util;
pub mod validate;

use tokio_util::sync::CancellationToken;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a stack-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    global: &GlobalOpts,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let cfg = crate::config::load(global)?;

    match cmd {
        Command::Plan => plan::handle(&cfg, global),
        Command::Apply(args) => apply::apply(&cfg, &args, global, cancel).await,
        Command::Destroy(args) => apply::destroy(&cfg, &args, global, cancel).await,
        Command::State(args) => state::handle(&cfg, args, global),
        Command::Outputs => outputs::handle(&cfg, global),
        Command::Validate => validate::handle(&cfg, global),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before dispatch".into(),
        )),
    }
}
