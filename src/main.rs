//! pagecase - test cases and browser-automation scripts from a web page
//!
//! Main entry point for the pagecase CLI.

use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pagecase_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};

mod adapters;
mod cli;
mod cmd_run;

use adapters::pagecase_dir;
use cli::{Cli, Commands};

/// Initialize tracing with console and file output.
///
/// Log files are written to `~/.pagecase/logs/` (or `logging.dir`) with
/// daily rotation; 14 files are kept. `RUST_LOG` overrides `logging.level`.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = logging
        .dir
        .clone()
        .unwrap_or_else(|| pagecase_dir().join("logs"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("pagecase")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes the file writer on drop; keep it for the program lifetime.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        // Console layer on stderr; stdout carries progress and the summary.
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

/// Load the config file (defaults when it is missing) and validate it.
fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_or_default(path)?;
    ConfigValidator::validate(&config).into_result()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    init_tracing(&config.logging)?;
    info!(config = ?cli.config, "pagecase starting");

    match cli.command {
        Commands::Run(args) => cmd_run::run(config, args).await,
        Commands::CheckConfig => check_config(&cli.config, &config),
    }
}

/// Print the validation outcome for the effective configuration.
fn check_config(path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        println!("Config file: {}", path.display());
    } else {
        println!("Config file {} not found, using defaults", path.display());
    }

    let result = ConfigValidator::validate(config);
    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }

    println!("provider:   {} ({})", config.provider.model, config.provider.base_url);
    println!(
        "generation: {} attempts, {} concurrent scripts, {} elements max",
        config.generation.max_attempts,
        config.generation.script_concurrency,
        config.generation.max_elements
    );
    println!("output:     {}", config.export.output_dir.display());
    println!("Configuration is valid.");
    Ok(())
}
