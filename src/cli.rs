use crate::config::{CliOverrides, Config, ExtractBackend, OverwritePolicy};
use crate::error::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bulkunpack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract large collections of tar.gz archives in parallel")]
#[command(
    long_about = "BulkUnpack finds every archive under a directory and extracts each one \
                  next to itself using a fixed pool of worker threads, reporting progress \
                  and a final success summary."
)]
#[command(before_help = "📦 BulkUnpack - Parallel Archive Extraction")]
#[command(after_help = "EXAMPLES:\n  \
    bulkunpack decompress ./shards\n  \
    bulkunpack decompress ./shards --workers 8 --ignore 89.tar.gz\n  \
    bulkunpack decompress ./shards --backend native --keep-existing\n  \
    bulkunpack clean ./shards --dry-run\n  \
    bulkunpack validate ./shards --output-format json")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file path
    #[arg(short, long, global = true, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract every archive under a directory in place
    Decompress {
        /// Directory containing the archives
        input: PathBuf,

        /// Number of concurrent extractions (defaults to the CPU count)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Archive file name to skip (repeatable)
        #[arg(long = "ignore", value_name = "NAME")]
        ignore: Vec<String>,

        /// Accepted archive suffixes (comma-separated, e.g. .tar.gz,.tgz)
        #[arg(long)]
        suffixes: Option<String>,

        /// Extraction backend
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,

        /// Leave files that already exist on disk untouched
        #[arg(long)]
        keep_existing: bool,

        /// Fraction of archives that must succeed for a zero exit code
        #[arg(long, value_name = "RATIO")]
        min_success_ratio: Option<f64>,
    },

    /// Remove zero-byte files left behind by interrupted transfers
    Clean {
        /// Directory to clean
        root: PathBuf,

        /// List empty files without removing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that every unpacked record directory is complete
    Validate {
        /// Directory holding unpacked records
        root: PathBuf,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    /// Run the configured external program (tar by default)
    Command,
    /// Decode in-process with tar and flate2
    Native,
}

impl From<BackendArg> for ExtractBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Command => ExtractBackend::Command,
            BackendArg::Native => ExtractBackend::Native,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        match &self.command {
            Some(Command::Decompress {
                workers,
                ignore,
                suffixes,
                backend,
                keep_existing,
                min_success_ratio,
                ..
            }) => CliOverrides::new()
                .with_workers(*workers)
                .with_ignore_files(if ignore.is_empty() {
                    None
                } else {
                    Some(ignore.clone())
                })
                .with_suffixes(suffixes.clone())
                .with_backend(backend.map(ExtractBackend::from))
                .with_overwrite(if *keep_existing {
                    Some(OverwritePolicy::KeepExisting)
                } else {
                    None
                })
                .with_min_success_ratio(*min_success_ratio),
            _ => CliOverrides::new(),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose > 0 && !self.quiet
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decompress() {
        let cli = Cli::try_parse_from([
            "bulkunpack",
            "decompress",
            "/data/shards",
            "-w",
            "4",
            "--ignore",
            "89.tar.gz",
            "--ignore",
            "90.tar.gz",
            "--backend",
            "native",
            "--keep-existing",
        ])
        .unwrap();

        match cli.command {
            Some(Command::Decompress {
                ref input,
                workers,
                ref ignore,
                keep_existing,
                ..
            }) => {
                assert_eq!(input, &PathBuf::from("/data/shards"));
                assert_eq!(workers, Some(4));
                assert_eq!(ignore, &vec!["89.tar.gz".to_string(), "90.tar.gz".to_string()]);
                assert!(keep_existing);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_overrides_from_decompress() {
        let cli = Cli::try_parse_from([
            "bulkunpack",
            "decompress",
            "in",
            "--workers",
            "3",
            "--ignore",
            "89.tar.gz",
            "--backend",
            "native",
            "--keep-existing",
            "--min-success-ratio",
            "0.5",
        ])
        .unwrap();

        let overrides = cli.create_cli_overrides();
        assert_eq!(overrides.workers, Some(3));
        assert_eq!(overrides.ignore_files, Some(vec!["89.tar.gz".to_string()]));
        assert_eq!(overrides.backend, Some(ExtractBackend::Native));
        assert_eq!(overrides.overwrite, Some(OverwritePolicy::KeepExisting));
        assert_eq!(overrides.min_success_ratio, Some(0.5));
    }

    #[test]
    fn test_zero_workers_rejected_by_config() {
        let cli =
            Cli::try_parse_from(["bulkunpack", "decompress", "in", "--workers", "0"]).unwrap();
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn test_clean_and_validate_parse() {
        let cli = Cli::try_parse_from(["bulkunpack", "clean", "root", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Clean { dry_run: true, .. })));
        assert!(cli.create_cli_overrides().workers.is_none());

        let cli = Cli::try_parse_from(["bulkunpack", "-q", "validate", "root"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Validate { .. })));
        assert_eq!(cli.verbosity_level(), 0);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["bulkunpack", "-q", "-v", "validate", "root"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbosity_level() {
        let cli = Cli::try_parse_from(["bulkunpack", "-vv", "validate", "root"]).unwrap();
        assert_eq!(cli.verbosity_level(), 2);
        assert!(cli.is_verbose());
    }
}
