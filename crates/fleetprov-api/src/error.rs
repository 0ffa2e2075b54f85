use std::time::Duration;

use thiserror::Error;

/// Error codes the control plane uses for a resource that does not exist.
const NOT_FOUND_CODES: &[&str] = &["ResourceNotFoundException", "NoSuchEntity", "NotFoundException"];

/// Error codes the control plane uses for throttling.
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

/// Error codes that indicate a server-side hiccup worth retrying.
const TRANSIENT_CODES: &[&str] = &["InternalFailure", "InternalServerException", "ServiceUnavailable"];

/// Top-level error type for the `fleetprov-api` crate.
///
/// Covers every failure mode of a control-plane round trip:
/// authentication, transport, throttling, and structured rejections.
/// `fleetprov-core` maps these into engine diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The bearer token was missing, expired, or rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The caller is authenticated but not allowed to perform the action.
    #[error("Access denied for {service}:{action}: {message}")]
    AccessDenied {
        service: String,
        action: String,
        message: String,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Throttling ──────────────────────────────────────────────────
    /// Throttled by the control plane. Includes retry-after in seconds.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Remote rejection ────────────────────────────────────────────
    /// Structured error returned by the control plane for an action.
    #[error("{service}:{action} rejected (HTTP {status}, {code}): {message}")]
    Remote {
        service: String,
        action: String,
        code: String,
        message: String,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed. The body itself is not kept: creation
    /// responses can carry key material.
    #[error("Deserialization error: {message} ({body_len} bytes)")]
    Deserialization { message: String, body_len: usize },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Remote { code, status, .. } => {
                *status >= 500 || TRANSIENT_CODES.contains(&code.as_str())
            }
            _ => false,
        }
    }

    /// Returns `true` if the control plane reports the target as absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Remote { code, status, .. } => {
                *status == 404 || NOT_FOUND_CODES.contains(&code.as_str())
            }
            _ => false,
        }
    }

    /// Server-suggested delay before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after_secs } if *retry_after_secs > 0 => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }

    /// Extract the remote error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Remote { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Classify a structured error body into the matching variant.
    pub(crate) fn from_remote(
        service: &str,
        action: &str,
        status: u16,
        code: String,
        message: String,
        retry_after_secs: Option<u64>,
    ) -> Self {
        if status == 429 || THROTTLING_CODES.contains(&code.as_str()) {
            return Self::RateLimited {
                retry_after_secs: retry_after_secs.unwrap_or(0),
            };
        }
        match status {
            401 => Self::Authentication { message },
            403 => Self::AccessDenied {
                service: service.to_owned(),
                action: action.to_owned(),
                message,
            },
            _ => Self::Remote {
                service: service.to_owned(),
                action: action.to_owned(),
                code,
                message,
                status,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn remote(status: u16, code: &str) -> Error {
        Error::from_remote("iot", "CreateThing", status, code.into(), "boom".into(), None)
    }

    #[test]
    fn throttling_code_becomes_rate_limited() {
        let err = remote(400, "ThrottlingException");
        assert!(matches!(err, Error::RateLimited { retry_after_secs: 0 }));
        assert!(err.is_transient());
    }

    #[test]
    fn not_found_by_code_or_status() {
        assert!(remote(400, "ResourceNotFoundException").is_not_found());
        assert!(remote(404, "Whatever").is_not_found());
        assert!(!remote(400, "ValidationException").is_not_found());
    }

    #[test]
    fn server_errors_are_transient_validation_is_not() {
        assert!(remote(503, "ServiceUnavailable").is_transient());
        assert!(remote(500, "Oops").is_transient());
        assert!(!remote(400, "ValidationException").is_transient());
    }

    #[test]
    fn retry_after_only_when_positive() {
        let err = Error::from_remote("iot", "X", 429, String::new(), String::new(), Some(3));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
        assert_eq!(remote(429, "").retry_after(), None);
    }

    #[test]
    fn auth_statuses_map_to_auth_variants() {
        assert!(matches!(remote(401, "x"), Error::Authentication { .. }));
        assert!(matches!(remote(403, "x"), Error::AccessDenied { .. }));
    }
}
