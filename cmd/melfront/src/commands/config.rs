//! Effective configuration dump.

use clap::Args;

use super::{get_config, output_result};
use crate::Cli;

/// Prints the frontend config with every default filled in.
#[derive(Args)]
pub struct ConfigCommand {
    /// Also validate the config by building the frontend
    #[arg(long)]
    check: bool,
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        if self.check {
            melfront::LogMelFrontend::new(cfg.clone())?;
        }
        output_result(&cfg, cli.output.as_deref(), cli.json)
    }
}
