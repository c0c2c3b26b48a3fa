use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;

use genre_core::{DatasetBuilder, JobConfig, LengthMismatchPolicy, RemainderPolicy};

/// Extract per-segment MFCCs from a genre-labelled audio tree into JSON.
#[derive(Parser, Debug)]
#[command(name = "genre-dataset", version)]
struct Args {
    /// Dataset root; every subdirectory is one genre.
    #[arg(short, long, env = "GENRE_DATASET_PATH")]
    input: Option<PathBuf>,

    /// Output JSON path [default: data.json]
    #[arg(short, long, env = "GENRE_DATASET_OUTPUT")]
    output: Option<PathBuf>,

    /// TOML job file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    sample_rate: Option<u32>,

    /// Track duration in seconds
    #[arg(long)]
    duration: Option<u32>,

    /// Segments per track
    #[arg(long)]
    segments: Option<usize>,

    /// MFCC coefficients per frame
    #[arg(long)]
    n_mfcc: Option<usize>,

    #[arg(long)]
    n_fft: Option<usize>,

    #[arg(long)]
    hop_length: Option<usize>,

    #[arg(long)]
    n_mels: Option<usize>,

    /// truncate | reject
    #[arg(long)]
    remainder: Option<RemainderPolicy>,

    /// drop | abort
    #[arg(long)]
    on_length_mismatch: Option<LengthMismatchPolicy>,
}

impl Args {
    /// Job file (or defaults) with command-line overrides applied.
    fn resolve(self) -> Result<(PathBuf, PathBuf, genre_core::ExtractionConfig)> {
        let job = match &self.config {
            Some(path) => JobConfig::from_toml_file(path)?,
            None => JobConfig::default(),
        };
        let mut extraction = job.extraction;

        if let Some(v) = self.sample_rate {
            extraction.sample_rate = v;
        }
        if let Some(v) = self.duration {
            extraction.track_duration_secs = v;
        }
        if let Some(v) = self.segments {
            extraction.num_segments = v;
        }
        if let Some(v) = self.n_mfcc {
            extraction.n_mfcc = v;
        }
        if let Some(v) = self.n_fft {
            extraction.n_fft = v;
        }
        if let Some(v) = self.hop_length {
            extraction.hop_length = v;
        }
        if let Some(v) = self.n_mels {
            extraction.n_mels = v;
        }
        if let Some(v) = self.remainder {
            extraction.remainder = v;
        }
        if let Some(v) = self.on_length_mismatch {
            extraction.on_length_mismatch = v;
        }

        let input = self
            .input
            .or(job.dataset_path)
            .ok_or_else(|| anyhow!("no dataset root given (use --input or dataset_path)"))?;
        let output = self
            .output
            .or(job.output_path)
            .unwrap_or_else(|| PathBuf::from("data.json"));

        Ok((input, output, extraction))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (input, output, extraction) = Args::parse().resolve()?;

    let builder = DatasetBuilder::new(extraction)?;
    let config = builder.config();
    let layout = builder.layout();

    info!("Dataset root: {}", input.display());
    info!(
        "sample_rate={} duration={}s segments={} n_mfcc={} n_fft={} hop={}",
        config.sample_rate,
        config.track_duration_secs,
        config.num_segments,
        config.n_mfcc,
        config.n_fft,
        config.hop_length
    );
    info!(
        "{} samples per segment, {} frames expected",
        layout.samples_per_segment, layout.expected_frame_count
    );

    let report = builder
        .run(&input, &output)
        .with_context(|| format!("dataset build for {} failed", input.display()))?;

    info!("Done: {report}");
    Ok(())
}
