//! `fleetprov outputs`: the stack's exported values.

use fleetprov_config::Config;
use fleetprov_core::StackOutputs;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

fn detail(o: &StackOutputs) -> String {
    output::detail_lines(&[
        ("Bucket", o.bucket_name.clone()),
        ("Role alias", o.role_alias.clone()),
        ("Vehicle", o.vehicle_name.clone()),
        ("Certificate secret", o.secret_name.clone()),
    ])
}

pub fn handle(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let outputs = config::stack_settings(cfg)?.outputs();
    let out = output::render_single(&global.output, &outputs, detail, |o| {
        o.vehicle_name.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
