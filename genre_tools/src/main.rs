mod summary;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// Check a genre dataset JSON and report how many segments each genre holds.
#[derive(Parser, Debug)]
#[command(name = "genre-inspect", version)]
struct Args {
    /// Dataset JSON written by genre-dataset
    dataset: PathBuf,

    /// Also write the per-genre counts as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let summary = summary::inspect(&args.dataset)?;
    summary.print();

    if let Some(csv_path) = args.csv {
        summary.write_csv(&csv_path)?;
    }

    Ok(())
}
