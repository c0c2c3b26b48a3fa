use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use genre_core::GenreDataset;

#[derive(Debug, Serialize, PartialEq)]
pub struct GenreRow {
    pub label: usize,
    pub genre: String,
    pub segments: usize,
}

#[derive(Debug)]
pub struct Summary {
    pub path: PathBuf,
    /// (segments, frames, coefficients)
    pub shape: (usize, usize, usize),
    pub rows: Vec<GenreRow>,
}

/// Loads and validates a dataset, collecting per-genre segment counts.
pub fn inspect(path: &Path) -> Result<Summary> {
    let dataset = GenreDataset::load(path)?;
    tracing::debug!(
        "{}: {} genres, {} segments",
        path.display(),
        dataset.mapping.len(),
        dataset.len()
    );
    let (frames, coeffs) = dataset
        .validate()
        .with_context(|| format!("{} is not a consistent dataset", path.display()))?
        .unwrap_or((0, 0));

    let rows = dataset
        .segments_per_genre()
        .into_iter()
        .zip(&dataset.mapping)
        .enumerate()
        .map(|(label, (segments, genre))| GenreRow {
            label,
            genre: genre.clone(),
            segments,
        })
        .collect();

    Ok(Summary {
        path: path.to_path_buf(),
        shape: (dataset.len(), frames, coeffs),
        rows,
    })
}

impl Summary {
    pub fn print(&self) {
        let (segments, frames, coeffs) = self.shape;
        println!("Dataset: {}", self.path.display());
        println!("Shape: ({segments}, {frames}, {coeffs})");
        for row in &self.rows {
            println!("  {:>3} {:<20} {}", row.label, row.genre, row.segments);
        }
        let empty = self.rows.iter().filter(|r| r.segments == 0).count();
        if empty > 0 {
            println!("Genres without segments: {empty}");
        }
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create output: {}", path.display()))?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        println!("Wrote: {}", path.display());
        Ok(())
    }
}
