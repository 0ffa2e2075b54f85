//! Configuration for the fleetprov CLI.
//!
//! TOML profiles, stack and engine sections, token resolution (env +
//! keyring + plaintext), and translation to the `fleetprov_core` runtime
//! types. The CLI layers its flag overrides on top of this crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fleetprov_core::{
    AssociationBehavior, Compression, ControlPlaneConfig, DocumentPaths, EngineConfig,
    RetryPolicy, RunMode, StackSettings, TlsVerification,
};

/// Keyring service under which profile tokens are stored.
pub const KEYRING_SERVICE: &str = "fleetprov";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("[stack] is missing required key '{key}'")]
    MissingStackKey { key: &'static str },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named control-plane profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// What to provision.
    #[serde(default)]
    pub stack: StackSection,

    /// How to run it.
    #[serde(default)]
    pub engine: EngineSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
            stack: StackSection::default(),
            engine: EngineSection::default(),
        }
    }
}

impl Config {
    /// The profile named `name`, or the default one.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named control-plane profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Control-plane base URL (e.g., "https://provision.example.com").
    pub endpoint: String,

    /// API token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the API token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

/// `[stack]`: every key is optional except `account` and `region`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct StackSection {
    pub account: Option<String>,
    pub region: Option<String>,
    pub device_name: Option<String>,
    pub bucket_name: Option<String>,
    pub bucket_prefix: Option<String>,
    pub role_name: Option<String>,
    pub role_alias: Option<String>,
    pub policy_name: Option<String>,
    pub secret_name: Option<String>,
    pub catalog_name: Option<String>,
    pub model_manifest_name: Option<String>,
    pub decoder_manifest_name: Option<String>,
    pub campaign_name: Option<String>,
    pub model_nodes: Option<Vec<String>>,
    pub campaign_signals: Option<Vec<String>>,
    pub period_ms: Option<u64>,
    pub compression: Option<Compression>,
    pub association: Option<AssociationBehavior>,

    /// Directory holding the three schema documents.
    pub schema_dir: Option<PathBuf>,
    pub nodes_file: Option<PathBuf>,
    pub network_interfaces_file: Option<PathBuf>,
    pub signal_decoders_file: Option<PathBuf>,
}

/// `[engine]`
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct EngineSection {
    pub state_path: Option<PathBuf>,
    pub mode: Option<RunMode>,
    #[serde(default)]
    pub retry: RetrySection,
}

/// `[engine.retry]`
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "fleetprov", "fleetprov").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fleetprov");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file; a missing file yields the defaults.
///
/// Environment variables use the `FLEETPROV_` prefix and `__` as the
/// section separator, e.g. `FLEETPROV_STACK__REGION=eu-west-1`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FLEETPROV_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/token"),
    )?)
}

/// Store `token` in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

/// Resolve the API token from the credential chain (no CLI flag step).
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_token_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        |profile_name| {
            keyring_entry(profile_name)
                .ok()
                .and_then(|entry| entry.get_password().ok())
        },
    )
}

fn resolve_token_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(val) = profile.token_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(secret) = keyring(profile_name) {
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation to core types ───────────────────────────────────────

/// Build a `ControlPlaneConfig` from a profile, no CLI flag overrides.
pub fn profile_to_control_plane_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ControlPlaneConfig, ConfigError> {
    let endpoint: url::Url = profile
        .endpoint
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "endpoint".into(),
            reason: format!("invalid URL: {}", profile.endpoint),
        })?;

    let token = resolve_token(profile, profile_name)?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(ControlPlaneConfig {
        endpoint,
        token,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    })
}

impl StackSection {
    /// Stack settings: the built-in defaults with this section's overrides.
    pub fn to_settings(&self) -> Result<StackSettings, ConfigError> {
        let account = self
            .account
            .as_deref()
            .ok_or(ConfigError::MissingStackKey { key: "account" })?;
        let region = self
            .region
            .as_deref()
            .ok_or(ConfigError::MissingStackKey { key: "region" })?;

        let mut s = StackSettings::new(account, region);

        // The secret name follows the device name unless set explicitly.
        if let Some(device) = &self.device_name {
            s.secret_name = format!("{device}-certificate");
            s.device_name.clone_from(device);
        }

        let strings = [
            (&self.bucket_name, &mut s.bucket_name),
            (&self.role_name, &mut s.role_name),
            (&self.role_alias, &mut s.role_alias),
            (&self.policy_name, &mut s.policy_name),
            (&self.secret_name, &mut s.secret_name),
            (&self.catalog_name, &mut s.catalog_name),
            (&self.model_manifest_name, &mut s.model_manifest_name),
            (&self.decoder_manifest_name, &mut s.decoder_manifest_name),
            (&self.campaign_name, &mut s.campaign_name),
        ];
        for (value, slot) in strings {
            if let Some(value) = value {
                slot.clone_from(value);
            }
        }

        if self.bucket_prefix.is_some() {
            s.bucket_prefix.clone_from(&self.bucket_prefix);
        }
        if let Some(nodes) = &self.model_nodes {
            s.model_nodes.clone_from(nodes);
        }
        if let Some(signals) = &self.campaign_signals {
            s.campaign_signals.clone_from(signals);
        }
        if let Some(period) = self.period_ms {
            if period == 0 {
                return Err(ConfigError::Validation {
                    field: "stack.period_ms".into(),
                    reason: "must be greater than zero".into(),
                });
            }
            s.period_ms = period;
        }
        if let Some(compression) = self.compression {
            s.compression = compression;
        }
        if let Some(association) = self.association {
            s.association = association;
        }
        Ok(s)
    }

    /// Schema document paths; relative paths resolve against `base`.
    pub fn document_paths(&self, base: &Path) -> DocumentPaths {
        let dir = base.join(self.schema_dir.as_deref().unwrap_or(Path::new("schemas")));
        let mut paths = DocumentPaths::in_dir(&dir);
        let overrides = [
            (&self.nodes_file, &mut paths.nodes),
            (&self.network_interfaces_file, &mut paths.network_interfaces),
            (&self.signal_decoders_file, &mut paths.signal_decoders),
        ];
        for (file, slot) in overrides {
            if let Some(file) = file {
                *slot = base.join(file);
            }
        }
        paths
    }
}

impl EngineSection {
    pub fn to_engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        let retry_defaults = RetryPolicy::default();
        EngineConfig {
            state_path: self.state_path.clone().unwrap_or(defaults.state_path),
            mode: self.mode.unwrap_or(defaults.mode),
            retry: RetryPolicy {
                max_attempts: self
                    .retry
                    .max_attempts
                    .unwrap_or(retry_defaults.max_attempts)
                    .max(1),
                base_delay: self
                    .retry
                    .base_delay_ms
                    .map_or(retry_defaults.base_delay, Duration::from_millis),
                max_delay: self
                    .retry
                    .max_delay_ms
                    .map_or(retry_defaults.max_delay, Duration::from_millis),
            },
        }
    }
}
