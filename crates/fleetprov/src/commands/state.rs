//! `fleetprov state`: inspect and edit the local state store.

use tabled::Tabled;

use fleetprov_config::Config;
use fleetprov_core::ResourceRecord;

use crate::cli::{GlobalOpts, OutputFormat, StateArgs, StateCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "#")]
    sequence: u64,
    #[tabled(rename = "Resource")]
    name: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Physical ID")]
    physical_id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn row(r: &ResourceRecord) -> RecordRow {
    RecordRow {
        sequence: r.sequence,
        name: r.logical_name.clone(),
        action: r.label(),
        physical_id: r.physical_id.clone(),
        status: match (&r.teardown_error, r.status) {
            (Some(_), _) => "teardown unresolved".to_owned(),
            (None, Some(status)) => status.to_string(),
            (None, None) => String::new(),
        },
        updated: r.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

fn detail(r: &ResourceRecord) -> String {
    let mut pairs = vec![
        ("Resource", r.logical_name.clone()),
        ("Action", r.label()),
        ("Physical ID", r.physical_id.clone()),
        ("Fingerprint", r.fingerprint.clone()),
        ("Sequence", r.sequence.to_string()),
        ("Created", r.created_at.to_rfc3339()),
        ("Updated", r.updated_at.to_rfc3339()),
    ];
    if let Some(status) = r.status {
        pairs.push(("Status", status.to_string()));
    }
    let teardown: Vec<String> = r
        .pre_delete
        .iter()
        .chain(r.delete.as_ref())
        .map(ToString::to_string)
        .collect();
    if !teardown.is_empty() {
        pairs.push(("Teardown", teardown.join(" -> ")));
    }
    if let Some(reason) = &r.teardown_error {
        pairs.push(("Teardown", format!("unresolved: {reason}")));
    }
    for (field, digest) in &r.sensitive_digests {
        pairs.push(("Sensitive", format!("{field} (sha256 {digest})")));
    }
    output::detail_lines(&pairs)
}

pub fn handle(cfg: &Config, args: StateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let engine = config::engine_config(global, cfg, false);
    let store = util::open_state(&engine)?;

    match args.command {
        StateCommand::List => {
            let records = store.records_in_creation_order();
            if records.is_empty() && matches!(global.output, OutputFormat::Table) {
                if !global.quiet {
                    eprintln!("No resources recorded in {}", engine.state_path.display());
                }
                return Ok(());
            }
            let out = output::render_list(
                &global.output,
                &records,
                row,
                |r| r.logical_name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        StateCommand::Show { name } => {
            let record = store.get(&name).ok_or(CliError::NotRecorded { name })?;
            let out = output::render_single(&global.output, &record, detail, |r| {
                r.physical_id.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        StateCommand::Forget { name } => {
            if !store.contains(&name) {
                return Err(CliError::NotRecorded { name });
            }
            let prompt = format!(
                "Forget '{name}'? The remote resource is kept but will no longer be managed."
            );
            if !util::confirm(&prompt, "state forget", global.yes)? {
                return Ok(());
            }
            if store.forget(&name)?.is_some() && !global.quiet {
                eprintln!("✓ Forgot '{name}'");
            }
            Ok(())
        }
    }
}
