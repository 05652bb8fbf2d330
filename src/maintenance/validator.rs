use crate::error::{BulkUnpackError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize)]
pub struct IncompleteRecord {
    pub directory: PathBuf,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub record_directories: usize,
    pub complete: usize,
    pub incomplete: Vec<IncompleteRecord>,
}

impl ValidationReport {
    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }
}

/// Checks that every unpacked record directory holds the full set of
/// expected sibling files.
///
/// A record directory is any directory containing at least one expected
/// file name.
pub struct DatasetValidator {
    expected_files: Vec<String>,
}

impl DatasetValidator {
    pub fn new(expected_files: Vec<String>) -> Self {
        Self { expected_files }
    }

    pub fn expected_files(&self) -> &[String] {
        &self.expected_files
    }

    pub fn validate<P: AsRef<Path>>(&self, root: P) -> Result<ValidationReport> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(BulkUnpackError::not_found(root));
        }

        let expected: BTreeSet<&str> = self.expected_files.iter().map(String::as_str).collect();
        let mut found: BTreeMap<PathBuf, BTreeSet<String>> = BTreeMap::new();

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry during validation");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !expected.contains(name) {
                continue;
            }

            if let Some(parent) = entry.path().parent() {
                found
                    .entry(parent.to_path_buf())
                    .or_default()
                    .insert(name.to_string());
            }
        }

        if found.is_empty() {
            return Err(BulkUnpackError::data_integrity(format!(
                "no record directories containing any of [{}] under {}",
                self.expected_files.join(", "),
                root.display()
            )));
        }

        let mut report = ValidationReport {
            record_directories: found.len(),
            ..ValidationReport::default()
        };

        for (directory, present) in found {
            let missing: Vec<String> = expected
                .iter()
                .filter(|name| !present.contains(**name))
                .map(|name| name.to_string())
                .collect();

            if missing.is_empty() {
                report.complete += 1;
            } else {
                report.incomplete.push(IncompleteRecord { directory, missing });
            }
        }

        Ok(report)
    }
}
