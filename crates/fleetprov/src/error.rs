//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use fleetprov_config::ConfigError;
use fleetprov_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const REMOTE: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 2;
    pub const CONFLICT: i32 = 6;
    pub const TIMEOUT: i32 = 8;
    pub const REPLACEMENT: i32 = 9;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Inputs ───────────────────────────────────────────────────────
    #[error("Invalid stack definition: {message}")]
    #[diagnostic(
        code(fleetprov::invalid_stack),
        help("Nothing was sent to the control plane. Fix the inputs and run: fleetprov validate")
    )]
    InvalidStack { message: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fleetprov::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(fleetprov::profile_not_found),
        help(
            "Create one with: fleetprov config init\n\
             Or pass --endpoint and --token directly."
        )
    )]
    ProfileNotFound { name: String },

    #[error("No API token configured for profile '{profile}'")]
    #[diagnostic(
        code(fleetprov::no_credentials),
        help(
            "Store one with: fleetprov config set-token --profile {profile}\n\
             Or set the FLEETPROV_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(fleetprov::config),
        help("Config file: {path}")
    )]
    Config { message: String, path: String },

    // ── Remote ───────────────────────────────────────────────────────
    #[error("{resource}: {message}")]
    #[diagnostic(
        code(fleetprov::remote),
        help(
            "Resources provisioned before the failure are recorded.\n\
             Fix the cause and re-run: fleetprov apply"
        )
    )]
    Remote { resource: String, message: String },

    #[error("Could not connect to control plane at {url}: {reason}")]
    #[diagnostic(
        code(fleetprov::connection_failed),
        help("Check the endpoint and your network. Use --insecure (-k) for self-signed certificates.")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("{resource}: request timed out")]
    #[diagnostic(
        code(fleetprov::timeout),
        help("Increase timeout with --timeout or check control-plane responsiveness.")
    )]
    Timeout { resource: String },

    // ── State ────────────────────────────────────────────────────────
    #[error("State conflict on '{resource}': {reason}")]
    #[diagnostic(
        code(fleetprov::state_conflict),
        help("This points at a missing ordering edge or a stale state file. Inspect with: fleetprov state list")
    )]
    StateConflict { resource: String, reason: String },

    #[error("'{resource}' must be replaced: {reason}")]
    #[diagnostic(
        code(fleetprov::replacement_required),
        help(
            "Reissue it and everything that depends on it:\n\
             fleetprov destroy --target {resource}, then fleetprov apply"
        )
    )]
    ReplacementRequired { resource: String, reason: String },

    #[error("'{resource}' ({physical_id}) was created but cannot be torn down: {reason}")]
    #[diagnostic(
        code(fleetprov::teardown_unknown),
        help(
            "Delete {physical_id} on the control plane by hand, then run:\n\
             fleetprov state forget {resource}"
        )
    )]
    TeardownUnknown {
        resource: String,
        physical_id: String,
        reason: String,
    },

    #[error("Resource '{name}' is not recorded in the state store")]
    #[diagnostic(
        code(fleetprov::not_found),
        help("Run: fleetprov state list")
    )]
    NotRecorded { name: String },

    #[error("State store error: {message}")]
    #[diagnostic(code(fleetprov::store))]
    Store { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(fleetprov::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Run cancelled; {completed} resource(s) finished before the interrupt")]
    #[diagnostic(
        code(fleetprov::cancelled),
        help("Re-run the same command to continue where it stopped.")
    )]
    Cancelled { completed: usize },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidStack { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoCredentials { .. }
            | Self::Config { .. } => exit_code::CONFIG,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::NotRecorded { .. } => exit_code::USAGE,
            Self::StateConflict { .. } | Self::TeardownUnknown { .. } | Self::Store { .. } => {
                exit_code::CONFLICT
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::ReplacementRequired { .. } => exit_code::REPLACEMENT,
            Self::Cancelled { .. } => exit_code::CANCELLED,
            Self::Remote { .. }
            | Self::ConnectionFailed { .. }
            | Self::Io(_)
            | Self::Internal(_) => exit_code::REMOTE,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        if err.is_configuration_error() {
            return CliError::InvalidStack {
                message: err.to_string(),
            };
        }

        match err {
            CoreError::Remote {
                resource, source, ..
            } if matches!(source, fleetprov_core::ApiError::Timeout { .. }) => {
                CliError::Timeout { resource }
            }

            CoreError::Remote {
                resource,
                action,
                source,
            } => CliError::Remote {
                resource,
                message: format!("{action}: {source}"),
            },

            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::StateConflict { resource, reason } => {
                CliError::StateConflict { resource, reason }
            }

            CoreError::ReplacementRequired { resource, reason } => {
                CliError::ReplacementRequired { resource, reason }
            }

            CoreError::TeardownUnknown {
                resource,
                physical_id,
                reason,
            } => CliError::TeardownUnknown {
                resource,
                physical_id,
                reason,
            },

            CoreError::Store { path, message } => CliError::Store {
                message: format!("{}: {message}", path.display()),
            },

            CoreError::Cancelled => CliError::Cancelled { completed: 0 },

            CoreError::Io(e) => CliError::Io(e),

            other => CliError::Internal(other.to_string()),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound { name },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config {
                message: other.to_string(),
                path: fleetprov_config::config_path().display().to_string(),
            },
        }
    }
}
