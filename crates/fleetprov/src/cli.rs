//! Clap derive structures for the `fleetprov` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fleetprov -- provision a fleet telemetry stack, idempotently
#[derive(Debug, Parser)]
#[command(
    name = "fleetprov",
    version,
    about = "Provision fleet telemetry stacks from the command line",
    long_about = "Builds the dependency graph of a fleet telemetry stack (device identity,\n\
        certificates, signal catalog, manifests, vehicle, campaign) and applies it\n\
        against the provisioning control plane. Re-running is safe: resources that\n\
        are already in place are left alone.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Control-plane profile to use
    #[arg(long, short = 'p', env = "FLEETPROV_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Control-plane endpoint URL (overrides profile)
    #[arg(long, short = 'e', env = "FLEETPROV_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// API token
    #[arg(long, env = "FLEETPROV_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "FLEETPROV_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// State file (overrides [engine] state_path)
    #[arg(long, env = "FLEETPROV_STATE", global = true)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FLEETPROV_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "FLEETPROV_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "FLEETPROV_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the execution order and what apply would change
    Plan,

    /// Create or update every resource of the stack
    Apply(ApplyArgs),

    /// Delete every recorded resource, newest first
    Destroy(DestroyArgs),

    /// Inspect or edit the local state store
    State(StateArgs),

    /// Show the stack's exported outputs
    Outputs,

    /// Load and validate schema documents and the resource graph
    Validate,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  APPLY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Keep going with resources that do not depend on a failed one
    #[arg(long)]
    pub best_effort: bool,
}

#[derive(Debug, Args)]
pub struct DestroyArgs {
    /// Only delete this resource and the recorded resources depending on it
    #[arg(long, value_name = "RESOURCE")]
    pub target: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StateArgs {
    #[command(subcommand)]
    pub command: StateCommand,
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// List recorded resources in creation order
    #[command(alias = "ls")]
    List,

    /// Show one recorded resource
    Show {
        /// Logical resource name
        name: String,
    },

    /// Drop a record without deleting the remote resource
    Forget {
        /// Logical resource name
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration (tokens redacted)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// Store an API token in the system keyring
    SetToken {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
