//! Clap derive structures for the `digitall` CLI.
//!
//! Only depends on clap + clap_complete so `build.rs` can include it for
//! man page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// digitall -- inspect and export Digitall WireGuard subscriptions
#[derive(Debug, Parser)]
#[command(
    name = "digitall",
    version,
    about = "Inspect Digitall subscriptions from the command line",
    long_about = "Resolves a subscription from its panel URL or bare token, shows\n\
        usage and expiry, checks the WireGuard profile and exports it.\n\n\
        URL forms: https://panel.example/sub/<token>, ?sub=<token>&api=<url>,\n\
        or just <token>.",
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
    /// API root used for token-derived URLs (overrides config)
    #[arg(long, env = "DIGITALL_API_BASE", global = true, hide_env = true)]
    pub api_base: Option<String>,

    /// Message language (overrides config and LANG)
    #[arg(long, env = "DIGITALL_LANG", global = true)]
    pub lang: Option<LangArg>,

    /// Output format [default: config `defaults.output`, else table]
    #[arg(long, short = 'o', env = "DIGITALL_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: config `defaults.color`, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Whole-request HTTP timeout in seconds
    #[arg(long, env = "DIGITALL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LangArg {
    En,
    Fa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
    /// Leave colors to the terminal
    System,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a subscription once and show its summary
    #[command(alias = "st")]
    Status(TargetArgs),

    /// Check the WireGuard profile for missing or malformed keys
    Validate(ValidateArgs),

    /// Write or print the WireGuard profile (refused while invalid)
    Export(ExportArgs),

    /// Follow a subscription and re-render on every change
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Panel URL or bare subscription token
    pub url: String,
}

// ── Validate ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Panel URL or bare subscription token
    #[arg(required_unless_present = "file")]
    pub url: Option<String>,

    /// Validate a local .conf file instead of a remote profile
    #[arg(long, short = 'f', conflicts_with = "url")]
    pub file: Option<PathBuf>,
}

// ── Export ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Panel URL or bare subscription token
    pub url: String,

    /// Print the raw profile to stdout instead of writing a file
    #[arg(long, conflicts_with = "out")]
    pub stdout: bool,

    /// Directory to write `digitall-<name>.conf` into
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Panel URL or bare subscription token
    #[arg(required_unless_present = "follow")]
    pub url: Option<String>,

    /// Follow a file whose contents are the current URL (re-read on every poll)
    #[arg(long, conflicts_with = "url")]
    pub follow: Option<PathBuf>,

    /// Navigation poll interval in seconds (overrides config)
    #[arg(long)]
    pub poll: Option<u64>,

    /// Forced reload interval in seconds, 0 disables (overrides config)
    #[arg(long)]
    pub refresh: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Persist the color theme preference
    SetTheme {
        /// Theme to store
        theme: ThemeArg,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
