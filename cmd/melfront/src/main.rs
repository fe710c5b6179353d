//! melfront CLI - log-mel feature extraction for raw PCM16 audio.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigCommand, ExtractCommand, ShapeCommand};

/// melfront CLI - compute log-mel spectrogram features.
///
/// The frontend is configured from a YAML or JSON file (--config). Without
/// one, a 16 kHz / 25 ms / 10 ms / 80 filter configuration is used.
#[derive(Parser)]
#[command(name = "melfront")]
#[command(about = "Log-mel spectrogram frontend CLI tool")]
#[command(version)]
pub struct Cli {
    /// Frontend config file (YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (default: YAML)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract features from raw PCM16 files
    Extract(ExtractCommand),
    /// Print the output shape for an input shape
    Shape(ShapeCommand),
    /// Print the effective frontend configuration
    Config(ConfigCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG takes precedence over -v.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Extract(cmd) => cmd.run(&cli),
        Commands::Shape(cmd) => cmd.run(&cli),
        Commands::Config(cmd) => cmd.run(&cli),
    }
}
