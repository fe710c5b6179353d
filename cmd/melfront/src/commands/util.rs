//! Utility functions for CLI commands.

use std::path::Path;

use anyhow::Context;
use melfront::{LogMelFrontend, LogMelFrontendConfig};

use crate::Cli;

/// Configuration used when no --config file is given.
pub fn default_config() -> LogMelFrontendConfig {
    LogMelFrontendConfig::new(16000, 25.0, 10.0, 80, 1e-6)
}

/// Loads the frontend config from --config, or the default one.
pub fn get_config(cli: &Cli) -> anyhow::Result<LogMelFrontendConfig> {
    match cli.config.as_deref() {
        Some(path) => load_file(path),
        None => Ok(default_config()),
    }
}

/// Builds the frontend from the configured file.
pub fn create_frontend(cli: &Cli) -> anyhow::Result<LogMelFrontend> {
    let cfg = get_config(cli)?;
    LogMelFrontend::new(cfg).context("invalid frontend config")
}

/// Loads a value from a YAML or JSON file, picked by extension.
pub fn load_file<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("yaml");

    let result = match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(&content).with_context(|| format!("failed to parse {path}"))?,
        _ => serde_yaml::from_str(&content).with_context(|| format!("failed to parse {path}"))?,
    };

    Ok(result)
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(
    result: &T,
    output_path: Option<&str>,
    as_json: bool,
) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)?
    } else {
        serde_yaml::to_string(result)?
    };

    match output_path {
        Some(path) => std::fs::write(path, output)?,
        None => println!("{}", output.trim_end()),
    }

    Ok(())
}

/// Prints verbose output if enabled.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}
