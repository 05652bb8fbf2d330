use bulkunpack::{
    BulkUnpack, BulkUnpackError, Cli, Command, OutputFormatter, OutputMode, RunSummary,
    UserFriendlyError, ValidationReport,
};
use clap::{CommandFactory, Parser};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    // Parse CLI arguments
    let cli = Cli::parse();
    setup_logging(cli.verbosity_level(), cli.quiet);

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let Some(command) = cli.command.clone() else {
        let _ = Cli::command().print_help();
        return 1;
    };

    let app = match BulkUnpack::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for_error(&e);
        }
    };

    let result = match command {
        Command::Decompress { input, .. } => {
            let workers = app.config().extract.workers;
            let min_success_ratio = app.config().extract.min_success_ratio;
            app.decompress(&input, workers)
                .map(|summary| exit_code_for_summary(&summary, min_success_ratio))
        }
        Command::Clean { root, dry_run } => app.clean(&root, dry_run).map(|report| {
            if !report.errors.is_empty() {
                app.output_formatter().warning(&format!(
                    "{} file(s) could not be inspected or removed",
                    report.errors.len()
                ));
            }
            0
        }),
        Command::Validate { root } => app
            .validate(&root)
            .map(|report| exit_code_for_validation(&report)),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            app.handle_error(&e);
            exit_code_for_error(&e)
        }
    }
}

fn exit_code_for_summary(summary: &RunSummary, min_success_ratio: f64) -> i32 {
    if summary.cancelled {
        130
    } else if summary.meets_threshold(min_success_ratio) {
        0
    } else {
        2
    }
}

fn exit_code_for_validation(report: &ValidationReport) -> i32 {
    if report.is_complete() {
        0
    } else {
        2
    }
}

fn exit_code_for_error(error: &BulkUnpackError) -> i32 {
    match error {
        BulkUnpackError::Cancelled => 130, // Interrupted (SIGINT)
        BulkUnpackError::NotFound { .. } => 3,
        BulkUnpackError::DataIntegrity { .. } => 4,
        BulkUnpackError::Config { .. } => 5,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "bulkunpack.toml".to_string());

    match BulkUnpack::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  bulkunpack --config {} decompress <INPUT>", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &BulkUnpackError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

fn setup_logging(verbosity: u8, quiet: bool) {
    if quiet && std::env::var_os("RUST_LOG").is_none() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(verbosity > 1)
        .with_writer(std::io::stderr)
        .init();
}
