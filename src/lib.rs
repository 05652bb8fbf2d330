pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod maintenance;
pub mod pool;
pub mod scanner;
pub mod ui;

#[cfg(test)]
mod test_support;

// Public API re-exports
pub use cli::{Cli, Command, OutputFormat};
pub use config::{
    CliOverrides, Config, ExtractBackend, ExtractConfig, OverwritePolicy, ScanConfig,
    ValidateConfig,
};
pub use error::{BulkUnpackError, Result, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{ArchiveExtractor, ExtractionResult, Extractor};
pub use maintenance::{CleanReport, DatasetValidator, EmptyFileCleaner, ValidationReport};
pub use pool::{Coordinator, ProgressTracker, RunSummary, WorkerPool};
pub use scanner::{ArchiveFilter, ArchivePath, ArchiveScanner};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use std::path::Path;
use tracing::debug;

/// Main library interface for BulkUnpack functionality
pub struct BulkUnpack {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl BulkUnpack {
    /// Create a new instance and install the Ctrl+C handler
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_shutdown(config, output_mode, verbose, quiet, shutdown))
    }

    /// Create an instance without registering a signal handler
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self::with_shutdown(
            config,
            output_mode,
            verbose,
            quiet,
            GracefulShutdown::new_for_test(),
        )
    }

    fn with_shutdown(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        // Progress bars would interleave with machine-readable output.
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    /// Create instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    /// Extract every archive under `input` with `workers` concurrent extractions.
    ///
    /// Individual archive failures are reported in the summary, not as errors.
    /// Errors are reserved for a missing input, an empty archive set, an
    /// invalid worker count or a crashed worker.
    pub fn decompress<P: AsRef<Path>>(&self, input: P, workers: usize) -> Result<RunSummary> {
        let input = input.as_ref();
        self.shutdown.check_shutdown()?;

        self.output_formatter
            .start_operation(&format!("Extracting archives under {}", input.display()));

        let extractor = ArchiveExtractor::from_config(&self.config.extract);
        self.output_formatter
            .info(&format!("Backend: {}", extractor.describe()));
        debug!(backend = %extractor.describe(), workers, "configured extraction");

        let scanner = ArchiveScanner::new(&self.config.scan);

        let coordinator = Coordinator::new(scanner, extractor)
            .with_progress(self.progress_manager.clone())
            .with_poll_interval(self.config.poll_interval())
            .with_cancellation(self.shutdown.flag());

        let summary = coordinator.run(input, workers)?;
        self.output_formatter.print_run_summary(&summary);

        Ok(summary)
    }

    /// Remove (or list, in dry-run mode) zero-byte files under `root`.
    pub fn clean<P: AsRef<Path>>(&self, root: P, dry_run: bool) -> Result<CleanReport> {
        let root = root.as_ref();
        self.output_formatter
            .start_operation(&format!("Removing empty files under {}", root.display()));

        let spinner = self.progress_manager.create_spinner("Scanning for empty files");
        let report = EmptyFileCleaner::new().with_dry_run(dry_run).clean(root);
        spinner.finish_and_clear();
        let report = report?;
        self.output_formatter.print_clean_report(&report);

        Ok(report)
    }

    /// Check every record directory under `root` for the expected files.
    pub fn validate<P: AsRef<Path>>(&self, root: P) -> Result<ValidationReport> {
        let root = root.as_ref();
        self.output_formatter
            .start_operation(&format!("Validating records under {}", root.display()));

        let validator = DatasetValidator::new(self.config.validate.expected_files.clone());
        let spinner = self.progress_manager.create_spinner("Checking record directories");
        let report = validator.validate(root);
        spinner.finish_and_clear();
        let report = report?;
        self.output_formatter.print_validation_report(&report);

        Ok(report)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::default().save_to_file(output_path)
    }

    /// Get configuration reference
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get output formatter reference
    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Get progress manager reference
    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Request graceful shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &BulkUnpackError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get build information
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BulkUnpack {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_tar_gz;
    use std::fs;
    use tempfile::TempDir;

    fn native_config() -> Config {
        let mut config = Config::default();
        config.extract.backend = ExtractBackend::Native;
        config.extract.poll_interval_ms = 5;
        config
    }

    #[test]
    fn test_bulkunpack_creation() {
        let app = BulkUnpack::new_for_test(Config::default(), OutputMode::Plain, 0, true);
        assert!(app.is_running());
        assert!(!app.progress_manager().is_enabled());
        assert_eq!(app.config().validate.expected_files.len(), 5);
    }

    #[test]
    fn test_decompress_native_archives() {
        let temp_dir = TempDir::new().unwrap();
        for index in 0..4 {
            let archive = temp_dir.path().join(format!("{}.tar.gz", index));
            let file = format!("{}/info.json", index);
            write_tar_gz(&archive, &[(file.as_str(), b"{}".as_slice())]);
        }

        let app = BulkUnpack::new_for_test(native_config(), OutputMode::Plain, 0, true);
        let summary = app.decompress(temp_dir.path(), 2).unwrap();

        assert_eq!(summary.total_archives, 4);
        assert_eq!(summary.succeeded, 4);
        assert!(summary.is_complete());
        for index in 0..4 {
            assert!(temp_dir.path().join(index.to_string()).join("info.json").exists());
        }
    }

    #[test]
    fn test_decompress_honours_ignore_list() {
        let temp_dir = TempDir::new().unwrap();
        write_tar_gz(&temp_dir.path().join("1.tar.gz"), &[("a.txt", b"a".as_slice())]);
        write_tar_gz(&temp_dir.path().join("89.tar.gz"), &[("b.txt", b"b".as_slice())]);

        let mut config = native_config();
        config.scan.ignore_files.push("89.tar.gz".to_string());

        let app = BulkUnpack::new_for_test(config, OutputMode::Plain, 0, true);
        let summary = app.decompress(temp_dir.path(), 1).unwrap();

        assert_eq!(summary.total_archives, 1);
        assert!(temp_dir.path().join("a.txt").exists());
        assert!(!temp_dir.path().join("b.txt").exists());
    }

    #[test]
    fn test_decompress_after_shutdown_is_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        write_tar_gz(&temp_dir.path().join("1.tar.gz"), &[("a.txt", b"a".as_slice())]);

        let app = BulkUnpack::new_for_test(native_config(), OutputMode::Plain, 0, true);
        app.request_shutdown();

        let result = app.decompress(temp_dir.path(), 1);
        assert!(matches!(result, Err(BulkUnpackError::Cancelled)));
        assert!(!temp_dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_clean_and_validate() {
        let temp_dir = TempDir::new().unwrap();
        let record = temp_dir.path().join("0");
        fs::create_dir(&record).unwrap();
        fs::write(record.join("info.json"), "{}").unwrap();
        fs::write(record.join("ocr.txt"), "").unwrap();

        let app = BulkUnpack::new_for_test(Config::default(), OutputMode::Plain, 0, true);

        let cleaned = app.clean(temp_dir.path(), false).unwrap();
        assert_eq!(cleaned.removed.len(), 1);
        assert!(!record.join("ocr.txt").exists());

        let report = app.validate(temp_dir.path()).unwrap();
        assert_eq!(report.record_directories, 1);
        assert!(!report.is_complete());
        assert!(report.incomplete[0].missing.contains(&"ocr.txt".to_string()));
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        let result = BulkUnpack::generate_sample_config(&config_path);
        assert!(result.is_ok());

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[scan]"));
        assert!(content.contains("[extract]"));
        assert!(Config::load_from_file(&config_path).is_ok());
    }

    #[test]
    fn test_version_info() {
        let version = version_info();
        assert!(!version.is_empty());

        let build_info = build_info();
        assert!(!build_info.version.is_empty());
        assert!(build_info.to_string().starts_with("BulkUnpack"));
    }
}
