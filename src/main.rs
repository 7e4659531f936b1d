//! Course Fetcher CLI application
//!
//! Command-line interface for downloading course videos from JSON manifests.
//! Features concurrent downloads, self-healing re-runs and progress tracking.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use course_fetcher::cli::{handle_config, handle_download, handle_plan, handle_verify, Cli, Commands};
use course_fetcher::config::AppConfig;
use course_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    init_logging(&cli);

    info!("Course Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    // Config commands must work even when the current file is broken
    let command = match cli.command {
        Commands::Config(args) => return handle_config(args, cli.global.config).await,
        command => command,
    };

    let config = AppConfig::load(cli.global.config.clone()).await?;
    let quiet = cli.global.quiet;

    match command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, config, quiet).await
        }
        Commands::Plan(args) => {
            info!("Executing plan command");
            handle_plan(args, config).await
        }
        Commands::Verify(args) => {
            info!("Executing verify command");
            handle_verify(args, config).await
        }
        Commands::Config(_) => Ok(()),
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("course_fetcher={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
