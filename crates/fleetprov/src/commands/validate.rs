//! `fleetprov validate`: documents, campaign selection and graph shape.

use fleetprov_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::util;

pub fn handle(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let stack = util::load_stack(cfg)?;
    if !global.quiet {
        println!(
            "✓ Stack is valid: {} resources, {} catalog nodes",
            stack.plan.len(),
            stack.schema.catalog.nodes.len()
        );
    }
    Ok(())
}
