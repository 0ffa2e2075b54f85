//! CLI-side configuration: layers global flags over `fleetprov_config`.
//!
//! Core never sees these types -- it receives pre-built runtime configs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use fleetprov_config::{Config, Profile};
use fleetprov_core::{
    ControlPlaneConfig, DocumentPaths, EngineConfig, RunMode, StackSettings, TlsVerification,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file in effect: `--config` or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(fleetprov_config::config_path)
}

/// Load the config file (defaults when it doesn't exist).
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(fleetprov_config::load_config_from(&config_file(global))?)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ControlPlaneConfig` from the active profile and flag overrides.
///
/// Without a matching profile, `--endpoint` and `--token` must both be given.
pub fn control_plane_config(
    global: &GlobalOpts,
    config: &Config,
) -> Result<ControlPlaneConfig, CliError> {
    let profile_name = active_profile_name(global, config);

    let Some(profile) = config.profiles.get(&profile_name) else {
        let Some(endpoint) = global.endpoint.as_deref() else {
            return Err(CliError::ProfileNotFound { name: profile_name });
        };
        let token = global
            .token
            .clone()
            .map(SecretString::from)
            .ok_or(CliError::NoCredentials {
                profile: profile_name,
            })?;
        return Ok(ControlPlaneConfig {
            endpoint: parse_endpoint(endpoint)?,
            token,
            tls: tls_mode(global.insecure || config.defaults.insecure, None),
            timeout: Duration::from_secs(global.timeout.unwrap_or(config.defaults.timeout)),
        });
    };

    resolve_profile(profile, &profile_name, global, config)
}

/// Translate a profile plus global flags into a `ControlPlaneConfig`.
fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
    config: &Config,
) -> Result<ControlPlaneConfig, CliError> {
    // 1. Endpoint (flag > env > profile)
    let endpoint = parse_endpoint(global.endpoint.as_deref().unwrap_or(&profile.endpoint))?;

    // 2. Token (flag > profile chain)
    let token = match &global.token {
        Some(token) => SecretString::from(token.clone()),
        None => fleetprov_config::resolve_token(profile, profile_name)?,
    };

    // 3. TLS verification
    let insecure =
        global.insecure || profile.insecure.unwrap_or(config.defaults.insecure);
    let tls = tls_mode(insecure, profile.ca_cert.as_deref());

    // 4. Timeout
    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(config.defaults.timeout);

    Ok(ControlPlaneConfig {
        endpoint,
        token,
        tls,
        timeout: Duration::from_secs(timeout),
    })
}

fn parse_endpoint(raw: &str) -> Result<url::Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: "endpoint".into(),
        reason: format!("invalid URL: {raw}"),
    })
}

fn tls_mode(insecure: bool, ca_cert: Option<&Path>) -> TlsVerification {
    if insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(path) = ca_cert {
        TlsVerification::CustomCa(path.to_path_buf())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Stack settings from the `[stack]` section.
pub fn stack_settings(config: &Config) -> Result<StackSettings, CliError> {
    Ok(config.stack.to_settings()?)
}

/// Schema document paths, relative to the working directory.
pub fn document_paths(config: &Config) -> Result<DocumentPaths, CliError> {
    let cwd = std::env::current_dir()?;
    Ok(config.stack.document_paths(&cwd))
}

/// Engine config with `--state` and `--best-effort` applied.
pub fn engine_config(global: &GlobalOpts, config: &Config, best_effort: bool) -> EngineConfig {
    let mut engine = config.engine.to_engine_config();
    if let Some(state) = &global.state {
        engine.state_path.clone_from(state);
    }
    if best_effort {
        engine.mode = RunMode::BestEffort;
    }
    engine
}
