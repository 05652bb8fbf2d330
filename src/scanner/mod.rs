pub mod archive_filter;
pub mod archive_scanner;

pub use archive_filter::ArchiveFilter;
pub use archive_scanner::{ArchivePath, ArchiveScanner, ScanStatistics};
