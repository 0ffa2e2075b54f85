// ── Core error types ──
//
// Engine-facing errors from fleetprov-core, grouped the way operators act
// on them: configuration problems (fix the inputs), remote failures
// (retry or fix permissions), state conflicts (an ordering bug), and
// replacement signals (explicit destroy-then-recreate).

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors (detected before any remote call) ──────
    #[error("Dependency cycle detected: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Resource '{name}' is declared more than once")]
    DuplicateResource { name: String },

    #[error("Resource '{resource}' depends on undeclared resource '{dependency}'")]
    UnknownDependency { resource: String, dependency: String },

    #[error("Resource '{resource}' binds to '{source_resource}.{field}', which is not available")]
    UnresolvedBinding {
        resource: String,
        source_resource: String,
        field: String,
    },

    #[error("Resource '{resource}' references its own output before it has executed")]
    SelfReference { resource: String },

    #[error("Campaign '{campaign}' selects '{signal}', which is not reachable from its model manifest")]
    SignalOutsideCatalog { campaign: String, signal: String },

    #[error("Invalid document {}: {message}", path.display())]
    InvalidDocument { path: PathBuf, message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Remote errors ────────────────────────────────────────────────
    #[error("{action} failed for '{resource}': {source}")]
    Remote {
        resource: String,
        action: String,
        #[source]
        source: fleetprov_api::Error,
    },

    #[error("Cannot reach control plane at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    // ── State errors ─────────────────────────────────────────────────
    #[error("State conflict on '{resource}': {reason}")]
    StateConflict { resource: String, reason: String },

    #[error("'{resource}' must be replaced: {reason}")]
    ReplacementRequired { resource: String, reason: String },

    #[error("'{resource}' ({physical_id}) exists remotely but its teardown could not be resolved: {reason}")]
    TeardownUnknown {
        resource: String,
        physical_id: String,
        reason: String,
    },

    #[error("State store {}: {message}", path.display())]
    Store { path: PathBuf, message: String },

    #[error("Run cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` for errors that are detected before any remote call and
    /// must never be retried.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::CyclicDependency { .. }
                | Self::DuplicateResource { .. }
                | Self::UnknownDependency { .. }
                | Self::UnresolvedBinding { .. }
                | Self::SelfReference { .. }
                | Self::SignalOutsideCatalog { .. }
                | Self::InvalidDocument { .. }
                | Self::ValidationFailed { .. }
                | Self::Config { .. }
        )
    }

    /// The logical resource name this error is tagged with, if any.
    pub fn resource(&self) -> Option<&str> {
        match self {
            Self::UnknownDependency { resource, .. }
            | Self::UnresolvedBinding { resource, .. }
            | Self::SelfReference { resource }
            | Self::Remote { resource, .. }
            | Self::StateConflict { resource, .. }
            | Self::ReplacementRequired { resource, .. }
            | Self::TeardownUnknown { resource, .. } => Some(resource),
            Self::DuplicateResource { name } => Some(name),
            _ => None,
        }
    }

    pub(crate) fn conflict(resource: &str, reason: impl Into<String>) -> Self {
        Self::StateConflict {
            resource: resource.to_owned(),
            reason: reason.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────
//
// Only used where no resource context exists (client construction).
// Invocation failures are wrapped in `CoreError::Remote` with the
// logical name and action attached.

impl From<fleetprov_api::Error> for CoreError {
    fn from(err: fleetprov_api::Error) -> Self {
        match err {
            fleetprov_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            fleetprov_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            fleetprov_api::Error::Transport(ref e) if e.is_connect() => {
                CoreError::ConnectionFailed {
                    url: e
                        .url()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "<unknown>".into()),
                    reason: e.to_string(),
                }
            }
            fleetprov_api::Error::Authentication { message } => CoreError::Config {
                message: format!("Authentication failed: {message}"),
            },
            other => CoreError::Internal(other.to_string()),
        }
    }
}
