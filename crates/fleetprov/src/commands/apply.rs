//! `fleetprov apply` and `fleetprov destroy`.

use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use fleetprov_config::Config;
use fleetprov_core::{Mode, Orchestrator, Outcome, RunReport, connect};

use crate::cli::{ApplyArgs, DestroyArgs, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Resource")]
    name: String,
    #[tabled(rename = "Result")]
    result: String,
}

fn tone(outcome: Outcome) -> Tone {
    match outcome {
        Outcome::Created | Outcome::Deleted => Tone::Good,
        Outcome::Updated => Tone::Warn,
        Outcome::Unchanged | Outcome::Absent => Tone::Dim,
    }
}

// ── Apply ────────────────────────────────────────────────────────────

pub async fn apply(
    cfg: &Config,
    args: &ApplyArgs,
    global: &GlobalOpts,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    // Validate everything locally before touching credentials or the network.
    let stack = util::load_stack(cfg)?;
    let engine = config::engine_config(global, cfg, args.best_effort);
    let store = util::open_state(&engine)?;

    let client = connect(&config::control_plane_config(global, cfg)?)?;
    let orchestrator = Orchestrator::new(client, engine).with_cancellation(cancel);

    let pb = util::spinner(
        &format!("Applying {} resources", stack.plan.len()),
        global.quiet,
    );
    let report = orchestrator.apply(&stack.plan, &store).await;
    pb.finish_and_clear();

    finish(report, global)
}

// ── Destroy ──────────────────────────────────────────────────────────

pub async fn destroy(
    cfg: &Config,
    args: &DestroyArgs,
    global: &GlobalOpts,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    // A targeted teardown needs the declared graph to find dependents.
    let stack = match &args.target {
        Some(_) => Some(util::load_stack(cfg)?),
        None => None,
    };
    let engine = config::engine_config(global, cfg, false);
    let store = util::open_state(&engine)?;

    let recorded = match (&args.target, &stack) {
        (Some(target), Some(stack)) => {
            let affected = stack.plan.dependents_of(target);
            if affected.is_empty() {
                return Err(CliError::Validation {
                    field: "--target".into(),
                    reason: format!("'{target}' is not a resource of this stack"),
                });
            }
            affected.iter().filter(|name| store.contains(name)).count()
        }
        _ => store.len(),
    };

    if recorded == 0 {
        if !global.quiet {
            eprintln!("Nothing to destroy");
        }
        return Ok(());
    }

    let prompt = format!("Delete {recorded} recorded resource(s) from the control plane?");
    if !util::confirm(&prompt, "destroy", global.yes)? {
        return Ok(());
    }

    let client = connect(&config::control_plane_config(global, cfg)?)?;
    let orchestrator = Orchestrator::new(client, engine).with_cancellation(cancel);

    let pb = util::spinner(&format!("Destroying {recorded} resources"), global.quiet);
    let report = match (&args.target, &stack) {
        (Some(target), Some(stack)) => orchestrator.destroy_target(&stack.plan, &store, target).await,
        _ => Ok(orchestrator.destroy(&store).await),
    };
    pb.finish_and_clear();

    finish(report?, global)
}

// ── Reporting ────────────────────────────────────────────────────────

/// Print the run report, then turn a failed run into the matching error.
fn finish(report: RunReport, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match global.output {
        OutputFormat::Table => {
            let mut rows: Vec<RunRow> = report
                .completed
                .iter()
                .map(|c| RunRow {
                    name: c.name.clone(),
                    result: output::paint(&c.outcome.to_string(), tone(c.outcome), color),
                })
                .collect();
            rows.extend(report.failed.iter().map(|f| RunRow {
                name: f.name.clone(),
                result: output::paint(&format!("failed: {}", f.reason), Tone::Bad, color),
            }));
            rows.extend(report.abandoned.iter().map(|name| RunRow {
                name: name.clone(),
                result: output::paint("abandoned", Tone::Warn, color),
            }));
            let out = output::render_table(&rows);
            output::print_output(&out, global.quiet);
            if !global.quiet {
                eprintln!("{}", summary(&report, color));
            }
        }
        OutputFormat::Plain => {
            let lines: Vec<String> = report
                .completed
                .iter()
                .map(|c| format!("{} {}", c.outcome, c.name))
                .chain(report.failed.iter().map(|f| format!("failed {}", f.name)))
                .chain(report.abandoned.iter().map(|n| format!("abandoned {n}")))
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
        }
        _ => {
            let out = output::render_single(&global.output, &report, |_| String::new(), |r| {
                r.run_id.to_string()
            })?;
            output::print_output(&out, global.quiet);
        }
    }

    into_result(report)
}

fn summary(report: &RunReport, color: bool) -> String {
    let verb = match report.mode {
        Mode::Apply => "Apply",
        Mode::Destroy => "Destroy",
    };
    let counts = match report.mode {
        Mode::Apply => format!(
            "{} created, {} updated, {} unchanged",
            report.count(Outcome::Created),
            report.count(Outcome::Updated),
            report.count(Outcome::Unchanged),
        ),
        Mode::Destroy => format!(
            "{} deleted, {} already gone",
            report.count(Outcome::Deleted),
            report.count(Outcome::Absent),
        ),
    };
    if report.is_success() {
        output::paint(&format!("{verb} complete: {counts}"), Tone::Good, color)
    } else {
        let tail = format!(
            "{} failed, {} abandoned",
            report.failed.len(),
            report.abandoned.len()
        );
        output::paint(&format!("{verb} incomplete: {counts}, {tail}"), Tone::Bad, color)
    }
}

fn into_result(report: RunReport) -> Result<(), CliError> {
    if report.cancelled {
        return Err(CliError::Cancelled {
            completed: report.completed.len(),
        });
    }
    match report.failed.into_iter().next() {
        Some(failure) => Err(failure.error.into()),
        None => Ok(()),
    }
}
