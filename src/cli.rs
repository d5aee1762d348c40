//! CLI definitions for pagecase.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// pagecase CLI.
#[derive(Parser)]
#[command(name = "pagecase")]
#[command(about = "Generate test cases and browser-automation scripts from a web page")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/pagecase.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the pipeline against one page
    Run(RunArgs),

    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[derive(Args)]
pub(crate) struct RunArgs {
    /// Page URL (http or https)
    #[arg(long)]
    pub url: String,

    /// Number of test cases to request (1-10)
    #[arg(short = 'n', long, default_value_t = 5)]
    pub count: u32,

    /// Output directory (overrides export.output_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Model identifier (overrides provider.model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Script generations in flight at once (overrides generation.script_concurrency)
    #[arg(long)]
    pub concurrency: Option<usize>,
}
