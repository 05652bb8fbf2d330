pub mod command;
pub mod native;

pub use command::CommandExtractor;
pub use native::NativeExtractor;

use crate::config::{ExtractBackend, ExtractConfig};
use crate::scanner::ArchivePath;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of one extraction attempt. Failures are values, never errors.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub path: PathBuf,
    pub succeeded: bool,
    /// `None` when no exit status exists: spawn failure, signal, or in-process backend.
    pub exit_code: Option<i32>,
    pub diagnostic: String,
    pub elapsed_ms: u64,
}

impl ExtractionResult {
    pub fn success(archive: &ArchivePath, exit_code: Option<i32>, elapsed: Duration) -> Self {
        Self {
            path: archive.path.clone(),
            succeeded: true,
            exit_code,
            diagnostic: String::new(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn failure<S: Into<String>>(
        archive: &ArchivePath,
        exit_code: Option<i32>,
        diagnostic: S,
        elapsed: Duration,
    ) -> Self {
        Self {
            path: archive.path.clone(),
            succeeded: false,
            exit_code,
            diagnostic: diagnostic.into(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Extracts a single archive into its containing directory.
///
/// Implementations must not panic or retry; every problem is reported
/// through the returned [`ExtractionResult`].
pub trait Extractor: Send + Sync {
    fn extract(&self, archive: &ArchivePath) -> ExtractionResult;
}

impl<F> Extractor for F
where
    F: Fn(&ArchivePath) -> ExtractionResult + Send + Sync,
{
    fn extract(&self, archive: &ArchivePath) -> ExtractionResult {
        self(archive)
    }
}

/// Backend selected by configuration.
pub enum ArchiveExtractor {
    Command(CommandExtractor),
    Native(NativeExtractor),
}

impl ArchiveExtractor {
    pub fn from_config(config: &ExtractConfig) -> Self {
        match config.backend {
            ExtractBackend::Command => ArchiveExtractor::Command(CommandExtractor::from_config(config)),
            ExtractBackend::Native => {
                ArchiveExtractor::Native(NativeExtractor::new().with_overwrite(config.overwrite))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ArchiveExtractor::Command(command) => format!("command ({})", command.program()),
            ArchiveExtractor::Native(_) => "native (tar + gzip)".to_string(),
        }
    }
}

impl Extractor for ArchiveExtractor {
    fn extract(&self, archive: &ArchivePath) -> ExtractionResult {
        match self {
            ArchiveExtractor::Command(command) => command.extract(archive),
            ArchiveExtractor::Native(native) => native.extract(archive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        let mut config = ExtractConfig::default();
        assert!(matches!(
            ArchiveExtractor::from_config(&config),
            ArchiveExtractor::Command(_)
        ));

        config.backend = ExtractBackend::Native;
        let extractor = ArchiveExtractor::from_config(&config);
        assert!(matches!(extractor, ArchiveExtractor::Native(_)));
        assert!(extractor.describe().starts_with("native"));
    }

    #[test]
    fn test_closures_are_extractors() {
        let archive = ArchivePath::new(PathBuf::from("/d/0.tar.gz"), PathBuf::from("0.tar.gz"), 1);
        let always_fails = |a: &ArchivePath| {
            ExtractionResult::failure(a, Some(2), "corrupt", Duration::ZERO)
        };

        let result = always_fails.extract(&archive);
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, Some(2));
        assert_eq!(result.path, archive.path);
    }
}
