//! Clap derive structures for the `hamlink` CLI.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hamlink_api::SnmpVersion;
use hamlink_core::{DeviceAddress, QueryApis};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hamlink -- inspect and correlate hamnet radio links
#[derive(Debug, Parser)]
#[command(
    name = "hamlink",
    version,
    about = "Query hamnet radio devices and correlate the links between them",
    long_about = "Detects MikroTik, Ubiquiti and Linux devices over SNMP (or the\n\
        RouterOS API), reports system data, interfaces and wireless peers,\n\
        and pairs both ends of a radio link into signal-level details.",
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
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "HAMLINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// SNMP community
    #[arg(long, env = "HAMLINK_COMMUNITY", global = true, hide_env_values = true)]
    pub community: Option<String>,

    /// SNMP port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// SNMP version to request (v1, v2c)
    #[arg(long, global = true)]
    pub snmp_version: Option<SnmpVersion>,

    /// Per-request timeout, e.g. "2s" or "500ms"
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Retries after the first attempt
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Query APIs detection may use: snmp, vendor, all
    #[arg(long, global = true)]
    pub allowed_apis: Option<QueryApis>,

    /// RouterOS API user (enables the vendor API when allowed)
    #[arg(long, env = "HAMLINK_LOGIN_USER", global = true)]
    pub login_user: Option<String>,

    /// Bypass the device cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Cache database path
    #[arg(long, env = "HAMLINK_CACHE_DB", global = true)]
    pub cache_db: Option<PathBuf>,

    /// Answer queries from an snmpwalk -On dump instead of the network.
    /// `ADDR=FILE` binds a dump to one device; a bare `FILE` serves any
    /// address without its own dump. Repeatable.
    #[arg(long, value_name = "[ADDR=]FILE", global = true)]
    pub replay: Vec<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HAMLINK_OUTPUT",
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
    /// Show detected model, version and system fields of a device
    #[command(alias = "sys")]
    System(DeviceArgs),

    /// List a device's network interfaces
    #[command(alias = "if")]
    Interfaces(DeviceArgs),

    /// List the wireless peers a device currently sees
    Peers(DeviceArgs),

    /// Correlate a device with the devices at the far end of its links
    Link(LinkArgs),

    /// List BGP sessions (RouterOS API only)
    Bgp(BgpArgs),

    /// Inspect and maintain the device cache
    Cache(CacheArgs),

    /// Poll the configured links, once or periodically
    Sweep(SweepArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Device commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Device IP address
    pub address: DeviceAddress,
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    /// Device on one end of the link
    pub a: DeviceAddress,

    /// Candidate devices on the other end
    #[arg(required = true, num_args = 1..)]
    pub b: Vec<DeviceAddress>,
}

#[derive(Debug, Args)]
pub struct BgpArgs {
    /// RouterOS device address
    pub address: DeviceAddress,

    /// Only sessions towards this peer address
    #[arg(long)]
    pub remote: Option<IpAddr>,
}

// ── Cache ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Show entry counts and age range
    Stats,

    /// Delete entries last refreshed longer ago than the given age
    Purge {
        /// Age threshold, e.g. "30days"
        #[arg(long, value_parser = humantime::parse_duration)]
        older_than: Duration,

        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete the entries of specific devices
    Invalidate {
        /// Device addresses
        #[arg(required = true, num_args = 1..)]
        addresses: Vec<DeviceAddress>,

        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
}

// ── Sweep ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SweepArgs {
    /// Run a single sweep and exit
    #[arg(long)]
    pub once: bool,

    /// Time between sweeps (overrides the configured interval)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Links polled in parallel (overrides the configured pool width)
    #[arg(long)]
    pub width: Option<usize>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration file path
    Path,

    /// Show the effective configuration
    Show,

    /// Interactive configuration wizard
    Init,

    /// Store the RouterOS API password in the system keyring
    SetPassword {
        /// RouterOS API user (defaults to the configured login user)
        #[arg(long)]
        user: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
