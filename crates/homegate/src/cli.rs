//! Clap derive structures for the `homegate` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// homegate -- talk to your home gateway's admin pages from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "homegate",
    version,
    about = "Manage a home gateway from the command line",
    long_about = "Inspect and manage a home gateway through its web admin interface.\n\n\
        Finds the gateway on the local network, keeps a login session alive,\n\
        and falls back to built-in sample data when no gateway is reachable.",
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
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "HOMEGATE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Gateway address (overrides profile)
    #[arg(long, short = 'a', env = "HOMEGATE_ADDRESS", global = true)]
    pub address: Option<String>,

    /// Admin username (overrides profile)
    #[arg(long, short = 'u', env = "HOMEGATE_USERNAME", global = true)]
    pub username: Option<String>,

    /// Serve built-in sample data instead of contacting a gateway
    #[arg(long, short = 'm', env = "HOMEGATE_MOCK", global = true)]
    pub mock: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HOMEGATE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "HOMEGATE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check whether the gateway can be reached
    Check,

    /// Show gateway status (model, firmware, uptime, SSID)
    #[command(alias = "info")]
    Status,

    /// List and manage connected devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Restart the gateway
    #[command(alias = "reboot")]
    Restart,

    /// Log in and keep the session for later commands
    Login,

    /// End the gateway session and forget it locally
    Logout,

    /// Explain whether a live connection is possible and what to try
    Advice,

    /// Manage configuration profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List every known device, sorted by hostname
    #[command(alias = "ls")]
    List,

    /// Block a device from the network
    Block {
        /// Device MAC address
        mac: String,
    },

    /// Allow a blocked device back on the network
    Unblock {
        /// Device MAC address
        mac: String,
    },

    /// Show byte counters for a device
    Traffic {
        /// Device MAC address
        mac: String,
    },

    /// Block devices during daily time windows
    #[command(alias = "sched")]
    Schedule(ScheduleArgs),
}

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    #[command(subcommand)]
    pub command: ScheduleCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScheduleCommand {
    /// Show every scheduled device and its windows
    #[command(alias = "ls")]
    List,

    /// Add a daily block window for a device
    Add {
        /// Device MAC address
        mac: String,

        /// Window start, local time (HH:MM)
        #[arg(long)]
        from: String,

        /// Window end, local time (HH:MM). Earlier than --from runs past midnight
        #[arg(long)]
        until: String,

        /// Days the window opens on (mon,tue,...). Every day when omitted
        #[arg(long, value_delimiter = ',')]
        days: Vec<String>,
    },

    /// Remove every window for a device
    #[command(alias = "rm")]
    Remove {
        /// Device MAC address
        mac: String,
    },

    /// Block and unblock scheduled devices to match their windows now
    Apply {
        /// Keep enforcing until interrupted
        #[arg(long)]
        watch: bool,

        /// Seconds between rounds with --watch
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
        every: u64,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Store a profile's password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
