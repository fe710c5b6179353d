//! Shape inference without running the frontend.

use clap::Args;
use serde::Serialize;

use super::{create_frontend, output_result};
use crate::Cli;

/// Prints `[batch, num_frames, num_filters, 1]` for `[batch, seq_len]`.
#[derive(Args)]
pub struct ShapeCommand {
    /// Number of samples per utterance (omit for unknown)
    #[arg(long)]
    seq_len: Option<usize>,

    /// Batch size (omit for unknown)
    #[arg(long)]
    batch: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ShapeReport {
    input: [Option<usize>; 2],
    output: [Option<usize>; 4],
    frame_size: usize,
    hop_size: usize,
    fft_size: usize,
}

impl ShapeCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let frontend = create_frontend(cli)?;
        let input = [self.batch, self.seq_len];
        let report = ShapeReport {
            input,
            output: frontend.output_shape(&input)?,
            frame_size: frontend.frame_size(),
            hop_size: frontend.hop_size(),
            fft_size: frontend.fft_size(),
        };
        output_result(&report, cli.output.as_deref(), cli.json)
    }
}
