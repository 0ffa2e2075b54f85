// ── Runtime configuration ──
//
// These types describe *how* to reach the control plane and *how* the
// engine runs. They carry credential data and tuning, but never touch
// disk. The CLI constructs them and hands them in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default for the public control plane.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (local gateways with self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for connecting to the control plane.
///
/// Built by the CLI, passed to [`crate::remote::connect`] -- core never
/// reads config files.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    /// Control-plane base URL (e.g., `https://provision.example.com`).
    pub endpoint: Url,
    /// Bearer token.
    pub token: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
}

/// How the orchestrator reacts to a failed resource.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RunMode {
    /// Abandon every not-yet-started resource after the first failure.
    #[default]
    FailFast,
    /// Keep going with resources that do not depend on a failed one.
    BestEffort,
}

/// Bounded exponential backoff for transient remote failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// `base * 2^attempt`, capped at `max_delay`. A server hint wins when
    /// it asks for a longer pause.
    pub fn delay_for(&self, attempt: u32, server_hint: Option<Duration>) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let backoff = self.base_delay.saturating_mul(factor).min(self.max_delay);
        match server_hint {
            Some(hint) if hint > backoff => hint,
            _ => backoff,
        }
    }
}

/// Engine tuning: where state lives, how failures propagate, how to retry.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub state_path: PathBuf,
    pub mode: RunMode,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(".fleetprov/state.json"),
            mode: RunMode::default(),
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(700),
        };
        assert_eq!(policy.delay_for(0, None), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1, None), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2, None), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3, None), Duration::from_millis(700));
        assert_eq!(policy.delay_for(31, None), Duration::from_millis(700));
    }

    #[test]
    fn server_hint_only_extends_the_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(0, Some(Duration::from_secs(3))),
            Duration::from_secs(3)
        );
        assert_eq!(
            policy.delay_for(0, Some(Duration::from_millis(1))),
            Duration::from_millis(200)
        );
    }

    #[test]
    fn run_mode_parses_kebab_case() {
        assert_eq!("best-effort".parse::<RunMode>().ok(), Some(RunMode::BestEffort));
        assert_eq!(RunMode::FailFast.to_string(), "fail-fast");
    }
}
