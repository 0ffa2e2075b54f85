//! Shared helpers for command handlers.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use fleetprov_config::Config;
use fleetprov_core::{EngineConfig, SchemaDocuments, Stack, StateStore, build_stack};

use crate::config;
use crate::error::CliError;

/// Load schema documents and assemble the validated stack. No remote calls.
pub fn load_stack(cfg: &Config) -> Result<Stack, CliError> {
    let settings = config::stack_settings(cfg)?;
    let paths = config::document_paths(cfg)?;
    let documents = SchemaDocuments::load(&paths)?;
    tracing::debug!(nodes = %paths.nodes.display(), "schema documents loaded");
    Ok(build_stack(&settings, &documents)?)
}

/// Open the state store named by the engine config.
pub fn open_state(engine: &EngineConfig) -> Result<StateStore, CliError> {
    Ok(StateStore::open(&engine.state_path)?)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Refuses outright when stdin is not a terminal.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(io::Error::other(e)))?;
    Ok(confirmed)
}

/// A stderr spinner, hidden when quiet or when stderr is not a terminal.
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
