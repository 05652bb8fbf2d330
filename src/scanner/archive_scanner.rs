use crate::config::ScanConfig;
use crate::error::{BulkUnpackError, Result};
use crate::scanner::archive_filter::ArchiveFilter;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// One archive found by the scanner. Never mutated after enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePath {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

impl ArchivePath {
    pub fn new(path: PathBuf, relative_path: PathBuf, size: u64) -> Self {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();

        Self {
            path,
            relative_path,
            file_name,
            size,
        }
    }

    /// Directory the archive is extracted into.
    pub fn parent_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn display_path(&self) -> String {
        self.relative_path.display().to_string()
    }
}

pub struct ArchiveScanner {
    filter: ArchiveFilter,
    max_depth: usize,
    require_non_empty: bool,
}

impl ArchiveScanner {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            filter: ArchiveFilter::new(config),
            max_depth: config.max_depth,
            require_non_empty: config.require_non_empty,
        }
    }

    pub fn with_require_non_empty(mut self, require: bool) -> Self {
        self.require_non_empty = require;
        self
    }

    pub fn scan_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<ArchivePath>> {
        let root_path = root.as_ref();

        if !root_path.exists() {
            return Err(BulkUnpackError::not_found(root_path));
        }

        if !root_path.is_dir() {
            return Err(BulkUnpackError::InvalidPath {
                path: format!("{} is not a directory", root_path.display()),
            });
        }

        let root_path = root_path.canonicalize()?;
        let mut archives = Vec::new();

        let walker = WalkDir::new(&root_path)
            .max_depth(self.max_depth)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| self.should_traverse(e, &root_path));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable entry during archive scan");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match self.process_file(&entry, &root_path) {
                Ok(Some(archive)) => archives.push(archive),
                Ok(None) => {}
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "failed to inspect archive");
                }
            }
        }

        if archives.is_empty() && self.require_non_empty {
            return Err(BulkUnpackError::data_integrity(format!(
                "no archives matching [{}] found under {} ({} names ignored)",
                self.filter.suffixes().join(", "),
                root_path.display(),
                self.filter.ignored_count()
            )));
        }

        archives.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        debug!(count = archives.len(), root = %root_path.display(), "archive scan finished");

        Ok(archives)
    }

    // Filter rules only ever see the part of the path below the scan root.
    fn should_traverse(&self, entry: &DirEntry, root_path: &Path) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }

        match entry.path().strip_prefix(root_path) {
            Ok(relative) => self.filter.should_traverse_directory(relative),
            Err(_) => false,
        }
    }

    fn process_file(&self, entry: &DirEntry, root_path: &Path) -> Result<Option<ArchivePath>> {
        let path = entry.path();
        let relative_path = path
            .strip_prefix(root_path)
            .map_err(|_| BulkUnpackError::InvalidPath {
                path: format!(
                    "Cannot calculate relative path for {} from root {}",
                    path.display(),
                    root_path.display()
                ),
            })?
            .to_path_buf();

        if !self.filter.accepts(&relative_path) {
            if self.filter.is_ignored(&relative_path) {
                debug!(path = %path.display(), "archive is on the ignore list");
            }
            return Ok(None);
        }

        let metadata = entry
            .metadata()
            .map_err(|e| BulkUnpackError::Io(e.into()))?;

        Ok(Some(ArchivePath::new(
            path.to_path_buf(),
            relative_path,
            metadata.len(),
        )))
    }

    pub fn get_statistics(&self, archives: &[ArchivePath]) -> ScanStatistics {
        let (largest_archive_size, largest_archive_path) = archives
            .iter()
            .max_by_key(|a| a.size)
            .map(|a| (a.size, a.relative_path.clone()))
            .unwrap_or((0, PathBuf::new()));

        ScanStatistics {
            total_archives: archives.len(),
            total_size: archives.iter().map(|a| a.size).sum(),
            largest_archive_size,
            largest_archive_path,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanStatistics {
    pub total_archives: usize,
    pub total_size: u64,
    pub largest_archive_size: u64,
    pub largest_archive_path: PathBuf,
}

impl ScanStatistics {
    pub fn display_summary(&self) -> String {
        let mut summary = format!(
            "Scan Results:\n  Archives: {}\n  Total size: {}\n",
            self.total_archives,
            format_bytes(self.total_size)
        );

        if self.largest_archive_size > 0 {
            summary.push_str(&format!(
                "  Largest archive: {} ({})\n",
                self.largest_archive_path.display(),
                format_bytes(self.largest_archive_size)
            ));
        }

        summary
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
