//! `fleetprov plan`: execution order and predicted changes, offline.

use tabled::Tabled;

use fleetprov_config::Config;
use fleetprov_core::{Offline, Orchestrator, PlannedChange, Prediction};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(rename = "Resource")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Change")]
    prediction: String,
    #[tabled(rename = "Depends on")]
    depends_on: String,
}

fn tone(prediction: Prediction) -> Tone {
    match prediction {
        Prediction::Create => Tone::Good,
        Prediction::Update | Prediction::Pending => Tone::Warn,
        Prediction::Replace => Tone::Bad,
        Prediction::Unchanged => Tone::Dim,
    }
}

pub fn handle(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let stack = util::load_stack(cfg)?;
    let engine = config::engine_config(global, cfg, false);
    let store = util::open_state(&engine)?;

    let changes = Orchestrator::new(Offline, engine).preview(&stack.plan, &store)?;
    let color = output::should_color(&global.color);

    let out = output::render_list(
        &global.output,
        &changes,
        |c: &PlannedChange| PlanRow {
            step: stack.plan.position(&c.name).map_or(0, |i| i + 1),
            name: c.name.clone(),
            kind: c.kind.to_string(),
            action: c.action.clone(),
            prediction: output::paint(&c.prediction.to_string(), tone(c.prediction), color),
            depends_on: c.depends_on.join(", "),
        },
        |c| format!("{} {}", c.prediction, c.name),
    )?;
    output::print_output(&out, global.quiet);

    if matches!(global.output, OutputFormat::Table) && !global.quiet {
        let pending = changes
            .iter()
            .filter(|c| c.prediction != Prediction::Unchanged)
            .count();
        eprintln!("{pending} of {} resources would change", changes.len());
    }
    Ok(())
}
