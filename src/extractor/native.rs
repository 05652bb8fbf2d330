use crate::config::OverwritePolicy;
use crate::extractor::{ExtractionResult, Extractor};
use crate::scanner::ArchivePath;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, trace};

const READ_BUFFER_SIZE: usize = 256 * 1024;

/// In-process tar.gz extraction, used where no `tar` binary is available.
pub struct NativeExtractor {
    overwrite: OverwritePolicy,
}

impl NativeExtractor {
    pub fn new() -> Self {
        Self {
            overwrite: OverwritePolicy::Overwrite,
        }
    }

    pub fn with_overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    fn unpack(&self, archive: &ArchivePath) -> io::Result<()> {
        let file = File::open(&archive.path)?;
        let decoder = GzDecoder::new(BufReader::with_capacity(READ_BUFFER_SIZE, file));
        let mut tar = tar::Archive::new(decoder);
        let target = archive.parent_dir();

        match self.overwrite {
            OverwritePolicy::Overwrite => {
                tar.set_overwrite(true);
                tar.unpack(target)
            }
            OverwritePolicy::KeepExisting => {
                // Directories are applied last so a read-only mode cannot block their children.
                let mut directories = Vec::new();
                for entry in tar.entries()? {
                    let mut entry = entry?;
                    if entry.header().entry_type().is_dir() {
                        directories.push(entry);
                        continue;
                    }

                    let relative = entry.path()?.into_owned();
                    if exists(&target.join(&relative)) {
                        trace!(entry = %relative.display(), "keeping existing file");
                        continue;
                    }
                    entry.unpack_in(target)?;
                }

                for mut directory in directories {
                    directory.unpack_in(target)?;
                }
                Ok(())
            }
        }
    }
}

impl Default for NativeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for NativeExtractor {
    fn extract(&self, archive: &ArchivePath) -> ExtractionResult {
        let start = Instant::now();

        match self.unpack(archive) {
            Ok(()) => {
                debug!(archive = %archive.display_path(), "unpacked in-process");
                ExtractionResult::success(archive, None, start.elapsed())
            }
            Err(err) => ExtractionResult::failure(
                archive,
                None,
                format!("failed to unpack {}: {}", archive.file_name, err),
                start.elapsed(),
            ),
        }
    }
}

fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_tar_gz;
    use std::fs;
    use tempfile::TempDir;

    fn fixture(dir: &Path) -> ArchivePath {
        let path = dir.join("0.tar.gz");
        write_tar_gz(
            &path,
            &[
                ("00001/caption.txt", b"a red sign".as_slice()),
                ("00001/ocr.txt", b"STOP".as_slice()),
            ],
        );
        let size = fs::metadata(&path).unwrap().len();
        ArchivePath::new(path, "0.tar.gz".into(), size)
    }

    #[test]
    fn test_extracts_next_to_archive() {
        let temp_dir = TempDir::new().unwrap();
        let archive = fixture(temp_dir.path());

        let result = NativeExtractor::new().extract(&archive);

        assert!(result.succeeded, "diagnostic: {}", result.diagnostic);
        let caption = fs::read_to_string(temp_dir.path().join("00001/caption.txt")).unwrap();
        assert_eq!(caption, "a red sign");
    }

    #[test]
    fn test_reextraction_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let archive = fixture(temp_dir.path());
        let extractor = NativeExtractor::new();

        assert!(extractor.extract(&archive).succeeded);
        fs::write(temp_dir.path().join("00001/ocr.txt"), "edited").unwrap();
        assert!(extractor.extract(&archive).succeeded);

        let ocr = fs::read_to_string(temp_dir.path().join("00001/ocr.txt")).unwrap();
        assert_eq!(ocr, "STOP");
    }

    #[test]
    fn test_keep_existing_leaves_files_alone() {
        let temp_dir = TempDir::new().unwrap();
        let archive = fixture(temp_dir.path());
        fs::create_dir(temp_dir.path().join("00001")).unwrap();
        fs::write(temp_dir.path().join("00001/ocr.txt"), "edited").unwrap();

        let result = NativeExtractor::new()
            .with_overwrite(OverwritePolicy::KeepExisting)
            .extract(&archive);

        assert!(result.succeeded, "diagnostic: {}", result.diagnostic);
        let ocr = fs::read_to_string(temp_dir.path().join("00001/ocr.txt")).unwrap();
        assert_eq!(ocr, "edited");
        assert!(temp_dir.path().join("00001/caption.txt").exists());
    }

    #[cfg(unix)]
    fn read_only_dir_fixture(dir: &Path) -> ArchivePath {
        let path = dir.join("5.tar.gz");
        let encoder = flate2::write::GzEncoder::new(
            File::create(&path).unwrap(),
            flate2::Compression::fast(),
        );
        let mut builder = tar::Builder::new(encoder);

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o555);
        builder
            .append_data(&mut header, "00005/", io::empty())
            .unwrap();

        let mut header = tar::Header::new_gnu();
        header.set_size(4);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, "00005/ocr.txt", b"EXIT".as_slice())
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let size = fs::metadata(&path).unwrap().len();
        ArchivePath::new(path, "5.tar.gz".into(), size)
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directory_entry_does_not_block_children() {
        use std::os::unix::fs::PermissionsExt;

        for policy in [OverwritePolicy::Overwrite, OverwritePolicy::KeepExisting] {
            let temp_dir = TempDir::new().unwrap();
            let archive = read_only_dir_fixture(temp_dir.path());

            let result = NativeExtractor::new().with_overwrite(policy).extract(&archive);

            assert!(result.succeeded, "{:?}: {}", policy, result.diagnostic);
            let record = temp_dir.path().join("00005");
            assert_eq!(fs::read_to_string(record.join("ocr.txt")).unwrap(), "EXIT");
            let mode = fs::metadata(&record).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o555);

            fs::set_permissions(&record, fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[test]
    fn test_corrupt_archive_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("89.tar.gz");
        fs::write(&path, b"definitely not gzip").unwrap();
        let archive = ArchivePath::new(path, "89.tar.gz".into(), 19);

        let result = NativeExtractor::new().extract(&archive);

        assert!(!result.succeeded);
        assert_eq!(result.exit_code, None);
        assert!(result.diagnostic.contains("89.tar.gz"));
    }
}
