use crate::error::{BulkUnpackError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub scan: ScanConfig,
    pub extract: ExtractConfig,
    pub validate: ValidateConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Accepted file-name suffixes. Empty means every regular file.
    pub suffixes: Vec<String>,
    /// Exact file names that are never extracted.
    pub ignore_files: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_depth: usize,
    pub require_non_empty: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractConfig {
    pub backend: ExtractBackend,
    pub program: String,
    pub args: Vec<String>,
    pub overwrite: OverwritePolicy,
    pub workers: usize,
    pub poll_interval_ms: u64,
    pub min_success_ratio: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidateConfig {
    /// File names every record directory must contain.
    pub expected_files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractBackend {
    /// Spawn an external program (`tar` by default) per archive.
    Command,
    /// Decode gzip and unpack tar in-process.
    Native,
}

/// What happens when an archive member already exists on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    Overwrite,
    KeepExisting,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            extract: ExtractConfig::default(),
            validate: ValidateConfig::default(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            suffixes: vec![".tar.gz".to_string(), ".tgz".to_string()],
            ignore_files: Vec::new(),
            exclude_dirs: Vec::new(),
            exclude_patterns: Vec::new(),
            max_depth: 16,
            require_non_empty: true,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            backend: ExtractBackend::Command,
            program: "tar".to_string(),
            args: vec!["-xzf".to_string()],
            overwrite: OverwritePolicy::Overwrite,
            workers: num_cpus::get().max(1),
            poll_interval_ms: 100,
            min_success_ratio: 1.0,
        }
    }
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            expected_files: vec![
                "caption.txt".to_string(),
                "charseg.npy".to_string(),
                "image.jpg".to_string(),
                "info.json".to_string(),
                "ocr.txt".to_string(),
            ],
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BulkUnpackError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BulkUnpackError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| BulkUnpackError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["bulkunpack.toml", ".bulkunpack.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(workers) = cli_args.workers {
            self.extract.workers = workers;
        }

        if let Some(ref ignore) = cli_args.ignore_files {
            for name in ignore {
                if !self.scan.ignore_files.contains(name) {
                    self.scan.ignore_files.push(name.clone());
                }
            }
        }

        if let Some(ref suffixes) = cli_args.suffixes {
            self.scan.suffixes = suffixes
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(backend) = cli_args.backend {
            self.extract.backend = backend;
        }

        if let Some(overwrite) = cli_args.overwrite {
            self.extract.overwrite = overwrite;
        }

        if let Some(ratio) = cli_args.min_success_ratio {
            self.extract.min_success_ratio = ratio;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| BulkUnpackError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| BulkUnpackError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.extract.workers == 0 {
            return Err(BulkUnpackError::config("Worker count must be at least 1"));
        }

        if self.extract.poll_interval_ms == 0 {
            return Err(BulkUnpackError::config(
                "Progress poll interval must be greater than 0",
            ));
        }

        if !(0.0..=1.0).contains(&self.extract.min_success_ratio) {
            return Err(BulkUnpackError::config(format!(
                "Minimum success ratio must be between 0 and 1 (got {})",
                self.extract.min_success_ratio
            )));
        }

        if self.extract.backend == ExtractBackend::Command && self.extract.program.trim().is_empty() {
            return Err(BulkUnpackError::config(
                "An extraction program is required for the command backend",
            ));
        }

        if self.scan.max_depth == 0 {
            return Err(BulkUnpackError::config(
                "Maximum directory depth must be greater than 0",
            ));
        }

        for pattern in &self.scan.exclude_patterns {
            Regex::new(pattern).map_err(|e| {
                BulkUnpackError::config(format!("Invalid exclude pattern '{}': {}", pattern, e))
            })?;
        }

        if self.validate.expected_files.is_empty() {
            return Err(BulkUnpackError::config(
                "At least one expected record file must be specified",
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.extract.poll_interval_ms)
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub workers: Option<usize>,
    pub ignore_files: Option<Vec<String>>,
    pub suffixes: Option<String>,
    pub backend: Option<ExtractBackend>,
    pub overwrite: Option<OverwritePolicy>,
    pub min_success_ratio: Option<f64>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_ignore_files(mut self, ignore: Option<Vec<String>>) -> Self {
        self.ignore_files = ignore;
        self
    }

    pub fn with_suffixes(mut self, suffixes: Option<String>) -> Self {
        self.suffixes = suffixes;
        self
    }

    pub fn with_backend(mut self, backend: Option<ExtractBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_overwrite(mut self, overwrite: Option<OverwritePolicy>) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_min_success_ratio(mut self, ratio: Option<f64>) -> Self {
        self.min_success_ratio = ratio;
        self
    }
}
