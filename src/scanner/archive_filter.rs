use crate::config::ScanConfig;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

/// Decides which files under a scan root are archives to extract.
///
/// Paths handed to the filter are relative to the scan root, so exclusion
/// patterns never match the root's own ancestors.
pub struct ArchiveFilter {
    suffixes: Vec<String>,
    ignore_files: HashSet<String>,
    exclude_dirs: Vec<String>,
    exclude_patterns: Vec<Regex>,
}

impl ArchiveFilter {
    pub fn new(config: &ScanConfig) -> Self {
        // Config::validate rejects bad patterns before a filter is built.
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Self {
            suffixes: config.suffixes.iter().map(|s| s.to_lowercase()).collect(),
            ignore_files: config.ignore_files.iter().cloned().collect(),
            exclude_dirs: config.exclude_dirs.clone(),
            exclude_patterns,
        }
    }

    /// Suffix check only; an empty suffix list accepts any file.
    pub fn is_archive_file(&self, path: &Path) -> bool {
        if self.suffixes.is_empty() {
            return true;
        }

        match path.file_name().and_then(|s| s.to_str()) {
            Some(filename) => {
                let filename_lower = filename.to_lowercase();
                self.suffixes
                    .iter()
                    .any(|suffix| filename_lower.ends_with(suffix.as_str()))
            }
            None => false,
        }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|name| self.ignore_files.contains(name))
    }

    pub fn accepts(&self, path: &Path) -> bool {
        self.is_archive_file(path)
            && !self.is_ignored(path)
            && !self.matches_any_pattern(&path.to_string_lossy())
    }

    pub fn should_traverse_directory(&self, path: &Path) -> bool {
        if let Some(dir_name) = path.file_name().and_then(|s| s.to_str()) {
            if self.exclude_dirs.iter().any(|exclude| exclude == dir_name) {
                return false;
            }
        }

        !self.matches_any_pattern(&path.to_string_lossy())
    }

    pub fn matches_any_pattern(&self, text: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(text))
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn ignored_count(&self) -> usize {
        self.ignore_files.len()
    }
}
