use crate::error::{BulkUnpackError, UserFriendlyError};
use crate::maintenance::{CleanReport, ValidationReport};
use crate::pool::RunSummary;
use crate::ui::progress::format_duration;
use console::{style, Emoji, Term};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    // Core messaging methods
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &BulkUnpackError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => eprintln!("SUGGESTION: {}", suggestion),
            }
        }
    }

    // Summaries. JSON is printed even in quiet mode so scripts can rely on it.
    pub fn print_run_summary(&self, summary: &RunSummary) {
        match self.mode {
            OutputMode::Json => self.print_json_report("run_summary", summary),
            _ if self.quiet => {}
            OutputMode::Human => self.print_human_run_summary(summary),
            OutputMode::Plain => self.print_plain_run_summary(summary),
        }
    }

    pub fn print_clean_report(&self, report: &CleanReport) {
        match self.mode {
            OutputMode::Json => self.print_json_report("clean_report", report),
            _ if self.quiet => {}
            _ => {
                let verb = if report.dry_run { "Would remove" } else { "Removed" };
                println!(
                    "{} {} empty file(s) out of {} scanned",
                    verb,
                    report.removed.len(),
                    report.files_scanned
                );
                if self.should_show_message(1) {
                    for path in &report.removed {
                        println!("  - {}", path.display());
                    }
                }
                for error in &report.errors {
                    println!("  ! {}", error);
                }
            }
        }
    }

    pub fn print_validation_report(&self, report: &ValidationReport) {
        match self.mode {
            OutputMode::Json => self.print_json_report("validation_report", report),
            _ if self.quiet => {}
            _ if report.is_complete() => self.success(&format!(
                "All {} record directories are complete",
                report.record_directories
            )),
            _ => {
                println!(
                    "Records: {} complete, {} incomplete ({} total)",
                    report.complete,
                    report.incomplete.len(),
                    report.record_directories
                );
                for record in &report.incomplete {
                    println!(
                        "  {} missing: {}",
                        record.directory.display(),
                        record.missing.join(", ")
                    );
                }
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => println!("{}", "-".repeat(60)),
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        if self.use_colors {
            let styled = match msg_type {
                MessageType::Success => style(message).green().bold(),
                MessageType::Error => style(message).red().bold(),
                MessageType::Warning => style(message).yellow().bold(),
                MessageType::Info => style(message).cyan(),
            };
            let emoji = match msg_type {
                MessageType::Success => CHECKMARK,
                MessageType::Error => CROSS,
                MessageType::Warning => WARNING,
                MessageType::Info => INFO,
            };

            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, styled),
                _ => println!("{}{}", emoji, styled),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_report<T: Serialize>(&self, kind: &str, report: &T) {
        self.print_json_object(&serde_json::json!({
            "type": kind,
            "report": report,
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn highlight(&self, value: String) -> String {
        if self.use_colors {
            style(value).cyan().bold().to_string()
        } else {
            value
        }
    }

    fn print_human_run_summary(&self, summary: &RunSummary) {
        println!();
        self.print_separator();

        let headline = if summary.cancelled {
            "Extraction cancelled"
        } else if summary.failed() == 0 {
            "Extraction completed!"
        } else {
            "Extraction completed with failures"
        };
        if self.use_colors {
            let styled = if summary.failed() == 0 && !summary.cancelled {
                style(headline).green().bold()
            } else {
                style(headline).yellow().bold()
            };
            println!("{}", styled);
        } else {
            println!("{}", headline);
        }

        println!();
        println!(
            "  Archives:     {}",
            self.highlight(summary.total_archives.to_string())
        );
        println!("  Attempted:    {}", self.highlight(summary.attempted.to_string()));
        println!(
            "  Succeeded:    {} ({:.1}%)",
            self.highlight(summary.succeeded.to_string()),
            summary.success_ratio() * 100.0
        );
        println!("  Workers:      {}", summary.worker_count);
        println!(
            "  Time taken:   {}",
            self.highlight(format_duration(summary.elapsed()))
        );

        if !summary.failures.is_empty() {
            println!();
            println!("Failed archives:");
            for failure in &summary.failures {
                let code = failure
                    .exit_code
                    .map(|c| format!("exit {}", c))
                    .unwrap_or_else(|| "no exit code".to_string());
                println!("  - {} ({}): {}", failure.path.display(), code, failure.diagnostic);
            }
        }

        self.print_separator();
    }

    fn print_plain_run_summary(&self, summary: &RunSummary) {
        println!("COMPLETED: Extraction");
        println!("Archives: {}", summary.total_archives);
        println!("Attempted: {}", summary.attempted);
        println!("Succeeded: {}", summary.succeeded);
        println!("Elapsed seconds: {:.3}", summary.elapsed_seconds);
        if summary.cancelled {
            println!("Cancelled: true");
        }
        for failure in &summary.failures {
            println!("FAILED: {}: {}", failure.path.display(), failure.diagnostic);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_creation() {
        let formatter = OutputFormatter::new(OutputMode::Plain, 1, false);
        assert_eq!(formatter.mode(), OutputMode::Plain);
        assert_eq!(formatter.verbose_level, 1);
        assert!(!formatter.use_colors);
    }

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(!formatter.should_show_message(0));
    }

    #[test]
    fn test_should_show_message() {
        let formatter = OutputFormatter::new(OutputMode::Human, 1, false);
        assert!(formatter.should_show_message(0));
        assert!(formatter.should_show_message(1));
        assert!(!formatter.should_show_message(2));
    }
}
