use crate::config::{ExtractConfig, OverwritePolicy};
use crate::extractor::{ExtractionResult, Extractor};
use crate::scanner::ArchivePath;
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::debug;

const MAX_DIAGNOSTIC_LEN: usize = 4096;

/// Runs an external program (`tar -xzf` by default) with the archive's
/// directory as working directory.
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
    overwrite: OverwritePolicy,
}

impl CommandExtractor {
    pub fn new<S: Into<String>>(program: S, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            overwrite: OverwritePolicy::Overwrite,
        }
    }

    pub fn from_config(config: &ExtractConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone()).with_overwrite(config.overwrite)
    }

    pub fn with_overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn build_command(&self, archive: &ArchivePath) -> Command {
        let mut command = Command::new(&self.program);

        // Policy flags go first so they cannot split `-f <archive>`.
        if self.overwrite == OverwritePolicy::KeepExisting {
            command.arg("--skip-old-files");
        }

        command
            .args(&self.args)
            .arg(&archive.path)
            .current_dir(archive.parent_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }
}

impl Extractor for CommandExtractor {
    fn extract(&self, archive: &ArchivePath) -> ExtractionResult {
        let start = Instant::now();
        let mut command = self.build_command(archive);
        debug!(archive = %archive.display_path(), program = %self.program, "spawning extraction");

        match command.output() {
            Ok(output) if output.status.success() => {
                ExtractionResult::success(archive, output.status.code(), start.elapsed())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let diagnostic = if stderr.is_empty() {
                    format!("{} exited with {}", self.program, output.status)
                } else {
                    truncate(stderr)
                };
                ExtractionResult::failure(archive, output.status.code(), diagnostic, start.elapsed())
            }
            Err(err) => ExtractionResult::failure(
                archive,
                None,
                format!("failed to run {}: {}", self.program, err),
                start.elapsed(),
            ),
        }
    }
}

fn truncate(mut text: String) -> String {
    if text.len() > MAX_DIAGNOSTIC_LEN {
        let mut cut = MAX_DIAGNOSTIC_LEN;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::write_tar_gz;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn archive_in(dir: &Path, name: &str) -> ArchivePath {
        let path = dir.join(name);
        fs::write(&path, b"payload").unwrap();
        ArchivePath::new(path, name.into(), 7)
    }

    fn shell(script: &str) -> CommandExtractor {
        // `sh -c <script> sh <archive>` exposes the archive as $1.
        CommandExtractor::new("sh", vec!["-c".to_string(), script.to_string(), "sh".to_string()])
    }

    #[test]
    fn test_runs_in_archive_directory() {
        let temp_dir = TempDir::new().unwrap();
        let archive = archive_in(temp_dir.path(), "0.tar.gz");

        let result = shell("test -f \"$1\" && pwd > cwd.txt").extract(&archive);

        assert!(result.succeeded, "diagnostic: {}", result.diagnostic);
        assert_eq!(result.exit_code, Some(0));
        let cwd = fs::read_to_string(temp_dir.path().join("cwd.txt")).unwrap();
        assert_eq!(
            Path::new(cwd.trim()).canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_non_zero_exit_is_captured() {
        let temp_dir = TempDir::new().unwrap();
        let archive = archive_in(temp_dir.path(), "1.tar.gz");

        let result = shell("echo 'unexpected end of file' >&2; exit 2").extract(&archive);

        assert!(!result.succeeded);
        assert_eq!(result.exit_code, Some(2));
        assert_eq!(result.diagnostic, "unexpected end of file");
    }

    #[test]
    fn test_silent_failure_reports_status() {
        let temp_dir = TempDir::new().unwrap();
        let archive = archive_in(temp_dir.path(), "2.tar.gz");

        let result = shell("exit 5").extract(&archive);

        assert!(!result.succeeded);
        assert!(result.diagnostic.starts_with("sh exited with"));
    }

    #[test]
    fn test_missing_binary_is_a_failure_not_a_panic() {
        let temp_dir = TempDir::new().unwrap();
        let archive = archive_in(temp_dir.path(), "3.tar.gz");

        let result = CommandExtractor::new("bulkunpack-no-such-binary", vec![]).extract(&archive);

        assert!(!result.succeeded);
        assert_eq!(result.exit_code, None);
        assert!(result.diagnostic.contains("bulkunpack-no-such-binary"));
    }

    #[test]
    fn test_keep_existing_adds_skip_flag_first() {
        let temp_dir = TempDir::new().unwrap();
        let archive = archive_in(temp_dir.path(), "4.tar.gz");

        let extractor = CommandExtractor::new("tar", vec!["-xzf".to_string()])
            .with_overwrite(OverwritePolicy::KeepExisting);
        let command = extractor.build_command(&archive);
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().to_string()).collect();

        assert_eq!(args[0], "--skip-old-files");
        assert_eq!(args[1], "-xzf");
        assert_eq!(args[2], archive.path.to_string_lossy());
    }

    /// `--skip-old-files` is a GNU tar option.
    fn gnu_tar_available() -> bool {
        Command::new("tar")
            .arg("--version")
            .output()
            .map(|output| {
                output.status.success()
                    && String::from_utf8_lossy(&output.stdout).contains("GNU tar")
            })
            .unwrap_or(false)
    }

    #[test]
    fn test_real_tar_keep_existing_and_overwrite() {
        if !gnu_tar_available() {
            eprintln!("GNU tar not found, skipping");
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("6.tar.gz");
        write_tar_gz(
            &path,
            &[
                ("00006/caption.txt", b"a blue door".as_slice()),
                ("00006/ocr.txt", b"PUSH".as_slice()),
            ],
        );
        let archive = ArchivePath::new(path, "6.tar.gz".into(), 1);
        let record = temp_dir.path().join("00006");
        fs::create_dir(&record).unwrap();
        fs::write(record.join("ocr.txt"), "edited").unwrap();

        let keep = CommandExtractor::new("tar", vec!["-xzf".to_string()])
            .with_overwrite(OverwritePolicy::KeepExisting);
        let result = keep.extract(&archive);

        assert!(result.succeeded, "diagnostic: {}", result.diagnostic);
        assert_eq!(fs::read_to_string(record.join("ocr.txt")).unwrap(), "edited");
        assert_eq!(
            fs::read_to_string(record.join("caption.txt")).unwrap(),
            "a blue door"
        );

        let overwrite = CommandExtractor::new("tar", vec!["-xzf".to_string()]);
        let result = overwrite.extract(&archive);

        assert!(result.succeeded, "diagnostic: {}", result.diagnostic);
        assert_eq!(fs::read_to_string(record.join("ocr.txt")).unwrap(), "PUSH");
    }

    #[test]
    fn test_truncate_long_diagnostics() {
        let long = "x".repeat(MAX_DIAGNOSTIC_LEN + 10);
        let truncated = truncate(long);
        assert_eq!(truncated.len(), MAX_DIAGNOSTIC_LEN + 3);
        assert!(truncated.ends_with("..."));
    }
}
