use crate::error::{BulkUnpackError, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub files_scanned: usize,
    pub removed: Vec<PathBuf>,
    pub errors: Vec<String>,
    pub dry_run: bool,
}

/// Removes zero-byte files, typically left behind by interrupted transfers.
pub struct EmptyFileCleaner {
    dry_run: bool,
}

impl EmptyFileCleaner {
    pub fn new() -> Self {
        Self { dry_run: false }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn clean<P: AsRef<Path>>(&self, root: P) -> Result<CleanReport> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(BulkUnpackError::not_found(root));
        }

        let mut report = CleanReport {
            dry_run: self.dry_run,
            ..CleanReport::default()
        };

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    report.errors.push(format!("Scan error: {}", err));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            report.files_scanned += 1;

            let is_empty = match entry.metadata() {
                Ok(metadata) => metadata.len() == 0,
                Err(err) => {
                    report.errors.push(format!("{}: {}", entry.path().display(), err));
                    continue;
                }
            };
            if !is_empty {
                continue;
            }

            if self.dry_run {
                debug!(path = %entry.path().display(), "would remove empty file");
                report.removed.push(entry.into_path());
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!(path = %entry.path().display(), "removed empty file");
                    report.removed.push(entry.into_path());
                }
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "could not remove empty file");
                    report
                        .errors
                        .push(format!("{}: {}", entry.path().display(), err));
                }
            }
        }

        report.removed.sort();
        Ok(report)
    }
}

impl Default for EmptyFileCleaner {
    fn default() -> Self {
        Self::new()
    }
}
