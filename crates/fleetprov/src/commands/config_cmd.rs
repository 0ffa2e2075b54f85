//! Config subcommand handlers.

use std::fmt::Write as _;
use std::path::Path;

use dialoguer::{Input, Select};

use fleetprov_config::{Config, Profile, StackSection};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking tokens.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "endpoint = \"{}\"", p.endpoint);
        if p.token.is_some() {
            let _ = writeln!(out, "token = \"****\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    let stack = &cfg.stack;
    let _ = writeln!(out);
    let _ = writeln!(out, "[stack]");
    for (key, value) in [
        ("account", &stack.account),
        ("region", &stack.region),
        ("device_name", &stack.device_name),
        ("bucket_name", &stack.bucket_name),
        ("bucket_prefix", &stack.bucket_prefix),
        ("role_name", &stack.role_name),
        ("role_alias", &stack.role_alias),
        ("policy_name", &stack.policy_name),
        ("secret_name", &stack.secret_name),
        ("catalog_name", &stack.catalog_name),
        ("model_manifest_name", &stack.model_manifest_name),
        ("decoder_manifest_name", &stack.decoder_manifest_name),
        ("campaign_name", &stack.campaign_name),
    ] {
        if let Some(value) = value {
            let _ = writeln!(out, "{key} = \"{value}\"");
        }
    }
    if let Some(period) = stack.period_ms {
        let _ = writeln!(out, "period_ms = {period}");
    }
    if let Some(ref dir) = stack.schema_dir {
        let _ = writeln!(out, "schema_dir = \"{}\"", dir.display());
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "[engine]");
    if let Some(ref state) = cfg.engine.state_path {
        let _ = writeln!(out, "state_path = \"{}\"", state.display());
    }
    if let Some(mode) = cfg.engine.mode {
        let _ = writeln!(out, "mode = \"{mode}\"");
    }

    out
}

/// Structured form of the config with every token replaced.
fn redacted_value(cfg: &Config) -> Result<serde_json::Value, CliError> {
    let mut value = serde_json::to_value(cfg)
        .map_err(|e| CliError::Internal(format!("config serialization failed: {e}")))?;
    if let Some(profiles) = value.get_mut("profiles").and_then(serde_json::Value::as_object_mut) {
        for profile in profiles.values_mut() {
            if let Some(token) = profile.get_mut("token").filter(|t| !t.is_null()) {
                *token = "****".into();
            }
        }
    }
    Ok(value)
}

fn save(cfg: &Config, path: &Path) -> Result<(), CliError> {
    fleetprov_config::save_config_to(cfg, path)?;
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_text(prompt: &str, default: &str) -> Result<String, CliError> {
    Input::new()
        .with_prompt(prompt)
        .default(default.to_owned())
        .interact_text()
        .map_err(prompt_err)
}

/// Read a token without echo, rejecting empty input.
fn prompt_token() -> Result<String, CliError> {
    let token = rpassword::prompt_password("API token: ").map_err(prompt_err)?;
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "API token cannot be empty".into(),
        });
    }
    Ok(token)
}

/// Offer keyring storage; `Some(token)` means keep it in the config file.
fn prompt_token_storage(token: &str, profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the API token?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        fleetprov_config::store_token(profile_name, token)?;
        eprintln!("   ✓ token stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(token.to_owned()))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_file(global);

    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            eprintln!("fleetprov configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            let profile_name = prompt_text("Profile name", "default")?;
            let endpoint = prompt_text("Control-plane URL", "https://provision.example.com")?;
            let token = prompt_token()?;
            let stored = prompt_token_storage(&token, &profile_name)?;

            let account = prompt_text("Account id", "")?;
            let region = prompt_text("Region", "eu-central-1")?;
            let device_name = prompt_text("Device name", "vehicle-ros2-test")?;

            let mut cfg = config::load(global)?;
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    endpoint,
                    token: stored,
                    ..Profile::default()
                },
            );
            cfg.default_profile = Some(profile_name.clone());
            cfg.stack = StackSection {
                account: Some(account),
                region: Some(region),
                device_name: Some(device_name),
                ..cfg.stack
            };

            // Catch a bad account or region before it lands on disk.
            cfg.stack.to_settings()?;
            save(&cfg, &path)?;

            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Next: fleetprov plan");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let redacted = redacted_value(&cfg)?;
            let out = output::render_single(
                &global.output,
                &redacted,
                |_| format_config_redacted(&cfg),
                |_| path.display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load(global)?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: fleetprov config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load(global)?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound { name });
            }
            cfg.default_profile = Some(name.clone());
            save(&cfg, &path)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── Set-token ───────────────────────────────────────────────
        ConfigCommand::SetToken { profile } => {
            let cfg = config::load(global)?;
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            let token = prompt_token()?;
            fleetprov_config::store_token(&profile_name, &token)?;
            eprintln!("✓ Token for '{profile_name}' stored in system keyring");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "prod".into(),
            Profile {
                endpoint: "https://provision.example.com".into(),
                token: Some("s3cr3t".into()),
                ..Profile::default()
            },
        );
        cfg.stack.account = Some("123456789012".into());
        cfg
    }

    #[test]
    fn table_view_masks_tokens() {
        let out = format_config_redacted(&sample());
        assert!(out.contains("[profiles.prod]"));
        assert!(out.contains("token = \"****\""));
        assert!(out.contains("account = \"123456789012\""));
        assert!(!out.contains("s3cr3t"));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn structured_view_masks_tokens() {
        let value = redacted_value(&sample()).unwrap();
        assert_eq!(value["profiles"]["prod"]["token"], "****");
        assert!(!value.to_string().contains("s3cr3t"));
    }
}
