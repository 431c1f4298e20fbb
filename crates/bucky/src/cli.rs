//! Command line interface definition.

use std::path::PathBuf;

use bucky_core::{CatalogConfig, LogFormat, LoggingConfig, SyncSettings};
use clap::{Args, Parser, Subcommand};

/// Bucky: find misplaced metrics in Carbon clusters and move them.
#[derive(Parser)]
#[command(name = "bucky")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(long, global = true, env = "BUCKY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (overrides config).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (overrides config).
    #[arg(long, global = true)]
    pub log_format: Option<LogFormatArg>,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Applies the global logging flags.
    pub fn apply_logging(&self, logging: &mut LoggingConfig) {
        if let Some(level) = &self.log_level {
            logging.level.clone_from(level);
        }
        if let Some(format) = self.log_format {
            logging.format = format.into();
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Report metrics stored on a node other than their hash ring owner.
    Inconsistent(InconsistentArgs),
    /// Copy metrics from one cluster to another, optionally renaming them.
    Backfill(BackfillArgs),
    /// Move misplaced metrics to their owner within one cluster.
    Rebalance(RebalanceArgs),
    /// Print version information.
    Version,
}

/// Output format for results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One `address: metric` line per misplaced metric.
    #[default]
    Text,
    /// A JSON object of address to metric names.
    Json,
}

/// Log format accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable format.
    Pretty,
    /// JSON format.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// Catalog flags shared by commands that list metrics.
#[derive(Args, Clone, Debug, Default)]
pub struct CatalogFlags {
    /// Force the daemons to rebuild their metric cache before listing.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Leave housekeeping metrics out of the consistency check.
    #[arg(long)]
    pub exclude_housekeeping: bool,

    /// Name prefix identifying housekeeping metrics.
    #[arg(long)]
    pub housekeeping_prefix: Option<String>,
}

impl CatalogFlags {
    /// Applies the flags over the file configuration.
    pub fn apply(&self, catalog: &mut CatalogConfig) {
        if self.force {
            catalog.force_rebuild = true;
        }
        if self.exclude_housekeeping {
            catalog.exclude_housekeeping = true;
        }
        if let Some(prefix) = &self.housekeeping_prefix {
            catalog.housekeeping_prefix.clone_from(prefix);
        }
    }
}

/// Executor flags shared by commands that move data.
#[derive(Args, Clone, Debug, Default)]
pub struct SyncFlags {
    /// Number of concurrent transfer workers.
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Log what would be copied without copying.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip metrics missing on the source instead of failing.
    #[arg(long)]
    pub ignore_missing: bool,

    /// Delete each source metric after it was copied.
    #[arg(long)]
    pub delete: bool,

    /// Timeout for a single metric transfer, in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Log every finished job.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl SyncFlags {
    /// Applies the flags over the file configuration.
    pub fn apply(&self, sync: &mut SyncSettings) {
        if let Some(workers) = self.workers {
            sync.workers = workers;
        }
        if self.dry_run {
            sync.dry_run = true;
        }
        if self.ignore_missing {
            sync.ignore_missing_source = true;
        }
        if self.delete {
            sync.delete_source = true;
        }
        if let Some(timeout) = self.timeout {
            sync.transfer_timeout_secs = timeout;
        }
    }
}

/// Arguments for the inconsistent command.
#[derive(Args)]
pub struct InconsistentArgs {
    /// Seed daemon of the cluster (host:port).
    #[arg(long, env = "BUCKY_HOST")]
    pub host: String,

    /// Only check metrics matching this regular expression.
    #[arg(short = 'r', long)]
    pub regex: Option<String>,

    /// Catalog options.
    #[command(flatten)]
    pub catalog: CatalogFlags,

    /// Output format (text, json).
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the backfill command.
#[derive(Args)]
pub struct BackfillArgs {
    /// Seed daemon of the source cluster (host:port).
    #[arg(long)]
    pub src_cluster_seed: String,

    /// Seed daemon of the destination cluster (host:port).
    #[arg(long)]
    pub dst_cluster_seed: String,

    /// JSON file mapping old metric names to new ones.
    #[arg(long)]
    pub metric_map_file: Option<PathBuf>,

    /// Copy every source metric matching this regular expression.
    #[arg(short = 'r', long)]
    pub regex: Option<String>,

    /// Force the source daemons to rebuild their metric cache.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Executor options.
    #[command(flatten)]
    pub sync: SyncFlags,
}

/// Arguments for the rebalance command.
#[derive(Args)]
pub struct RebalanceArgs {
    /// Seed daemon of the cluster (host:port).
    #[arg(long, env = "BUCKY_HOST")]
    pub host: String,

    /// Only rebalance metrics matching this regular expression.
    #[arg(short = 'r', long)]
    pub regex: Option<String>,

    /// Catalog options.
    #[command(flatten)]
    pub catalog: CatalogFlags,

    /// Executor options.
    #[command(flatten)]
    pub sync: SyncFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["bucky", "version"]);
        assert!(matches!(cli.command, Commands::Version));

        let cli = Cli::parse_from(["bucky", "--config", "/etc/bucky.toml", "version"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/bucky.toml")));
    }

    #[test]
    fn test_inconsistent_parsing() {
        let cli = Cli::parse_from([
            "bucky",
            "inconsistent",
            "--host",
            "graphite-a:4242",
            "-f",
            "-r",
            "^servers\\.",
            "--exclude-housekeeping",
            "--format",
            "json",
        ]);
        let Commands::Inconsistent(args) = cli.command else {
            panic!("Expected Inconsistent command");
        };
        assert_eq!(args.host, "graphite-a:4242");
        assert_eq!(args.regex.as_deref(), Some("^servers\\."));
        assert!(args.catalog.force);
        assert!(args.catalog.exclude_housekeeping);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_backfill_parsing() {
        let cli = Cli::parse_from([
            "bucky",
            "backfill",
            "--src-cluster-seed",
            "graphite-a:4242",
            "--dst-cluster-seed",
            "carbon-1:4242",
            "--metric-map-file",
            "map.json",
            "-w",
            "16",
            "--dry-run",
            "--ignore-missing",
        ]);
        let Commands::Backfill(args) = cli.command else {
            panic!("Expected Backfill command");
        };
        assert_eq!(args.metric_map_file, Some(PathBuf::from("map.json")));
        assert!(args.regex.is_none());
        assert_eq!(args.sync.workers, Some(16));
        assert!(args.sync.dry_run);
        assert!(args.sync.ignore_missing);
        assert!(!args.sync.delete);
    }

    #[test]
    fn test_rebalance_parsing() {
        let cli = Cli::parse_from([
            "bucky",
            "--log-format",
            "json",
            "rebalance",
            "--host",
            "graphite-a:4242",
            "--delete",
            "--timeout",
            "30",
        ]);
        assert_eq!(cli.log_format, Some(LogFormatArg::Json));
        let Commands::Rebalance(args) = cli.command else {
            panic!("Expected Rebalance command");
        };
        assert!(args.sync.delete);
        assert_eq!(args.sync.timeout, Some(30));
    }

    #[test]
    fn test_flags_override_config() {
        let mut sync = SyncSettings::default();
        SyncFlags { workers: Some(8), delete: true, ..Default::default() }.apply(&mut sync);
        assert_eq!(sync.workers, 8);
        assert!(sync.delete_source);
        assert!(!sync.dry_run);

        let mut catalog = CatalogConfig::default();
        CatalogFlags { housekeeping_prefix: Some("bucky.".to_string()), ..Default::default() }
            .apply(&mut catalog);
        assert_eq!(catalog.housekeeping_prefix, "bucky.");
        assert!(!catalog.exclude_housekeeping);

        let cli = Cli::parse_from(["bucky", "--log-level", "debug", "version"]);
        let mut logging = LoggingConfig::default();
        cli.apply_logging(&mut logging);
        assert_eq!(logging.level, "debug");
        assert_eq!(logging.format, LogFormat::Pretty);
    }
}
