//! Feature extraction from raw PCM16 files.

use anyhow::Context;
use clap::Args;
use melfront::{DType, Tensor};
use ndarray::{Array2, Axis, s};
use serde::Serialize;
use tracing::debug;

use super::{create_frontend, output_result, print_verbose};
use crate::Cli;

/// Runs the frontend over raw little-endian PCM16 mono files as one padded
/// batch.
#[derive(Args)]
pub struct ExtractCommand {
    /// Raw PCM16 files; shorter files are padded to the longest one
    #[arg(required = true)]
    files: Vec<String>,

    /// Include the features of every unpadded frame in the output
    #[arg(long)]
    features: bool,
}

#[derive(Debug, Serialize)]
struct ExtractReport {
    /// `[batch, num_frames, num_filters, 1]`.
    shape: Vec<usize>,
    dtype: DType,
    utterances: Vec<UtteranceReport>,
}

#[derive(Debug, Serialize)]
struct UtteranceReport {
    file: String,
    num_samples: usize,
    num_frames: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    features: Option<Vec<Vec<f64>>>,
}

impl ExtractCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let frontend = create_frontend(cli)?;

        let mut utterances = Vec::with_capacity(self.files.len());
        for path in &self.files {
            let pcm = std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
            let samples = Tensor::from_pcm16_le(&pcm);
            print_verbose(cli, &format!("{path}: {} samples", samples.shape()[1]));
            utterances.push(samples);
        }

        let seq_len = utterances.iter().map(|u| u.shape()[1]).max().unwrap_or(0);
        let mut inputs = Array2::<f64>::zeros((utterances.len(), seq_len));
        let mut paddings = Array2::<f64>::ones((utterances.len(), seq_len));
        for (b, utt) in utterances.iter().enumerate() {
            let n = utt.shape()[1];
            inputs.slice_mut(s![b, ..n]).assign(&utt.data().row(0));
            paddings.slice_mut(s![b, ..n]).fill(0.0);
        }
        debug!(batch = utterances.len(), seq_len, "extracting");

        let out = frontend
            .forward(&Tensor::new(inputs, DType::I16), paddings.view())
            .context("feature extraction failed")?;

        let features = out.outputs.data().index_axis(Axis(3), 0);
        let report = ExtractReport {
            shape: out.outputs.shape().to_vec(),
            dtype: out.outputs.dtype(),
            utterances: self
                .files
                .iter()
                .zip(&utterances)
                .enumerate()
                .map(|(b, (file, utt))| {
                    let valid: Vec<usize> = out
                        .paddings
                        .row(b)
                        .iter()
                        .enumerate()
                        .filter(|&(_, &p)| p == 0.0)
                        .map(|(t, _)| t)
                        .collect();
                    UtteranceReport {
                        file: file.clone(),
                        num_samples: utt.shape()[1],
                        num_frames: valid.len(),
                        features: self.features.then(|| {
                            valid
                                .iter()
                                .map(|&t| features.slice(s![b, t, ..]).to_vec())
                                .collect()
                        }),
                    }
                })
                .collect(),
        };

        output_result(&report, cli.output.as_deref(), cli.json)
    }
}
