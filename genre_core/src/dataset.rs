//! The persisted genre dataset: label names, per-segment MFCC matrices and
//! their integer labels.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// MFCC segments with their genre labels.
///
/// `mfcc[i]` is labelled `labels[i]`, which indexes `mapping`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenreDataset {
    pub mapping: Vec<String>,
    #[serde(rename = "mfcc")]
    pub features: Vec<Vec<Vec<f32>>>,
    pub labels: Vec<usize>,
}

impl GenreDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a genre and returns its label ID.
    pub fn push_genre(&mut self, name: impl Into<String>) -> Result<usize> {
        let name = name.into();
        if self.mapping.contains(&name) {
            return Err(DatasetError::InvalidDataset(format!(
                "genre '{name}' registered twice"
            )));
        }
        self.mapping.push(name);
        Ok(self.mapping.len() - 1)
    }

    /// Appends one segment's (frames, coefficients) matrix under `label`.
    pub fn push_segment(&mut self, label: usize, mfcc: &Array2<f32>) {
        debug_assert!(label < self.mapping.len());
        self.features
            .push(mfcc.rows().into_iter().map(|row| row.to_vec()).collect());
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Checks the dataset invariants and returns the common
    /// `(frames, coefficients)` shape, or `None` when there are no segments.
    pub fn validate(&self) -> Result<Option<(usize, usize)>> {
        if self.features.len() != self.labels.len() {
            return Err(DatasetError::InvalidDataset(format!(
                "{} feature matrices but {} labels",
                self.features.len(),
                self.labels.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.mapping.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(DatasetError::InvalidDataset(format!(
                "duplicate genre '{dup}' in mapping"
            )));
        }

        if let Some((i, label)) = self
            .labels
            .iter()
            .enumerate()
            .find(|(_, l)| **l >= self.mapping.len())
        {
            return Err(DatasetError::InvalidDataset(format!(
                "label {label} at segment {i} is outside mapping of {} genres",
                self.mapping.len()
            )));
        }

        let Some(first) = self.features.first() else {
            return Ok(None);
        };
        let shape = (first.len(), first.first().map_or(0, Vec::len));

        for (i, matrix) in self.features.iter().enumerate() {
            if matrix.len() != shape.0 {
                return Err(DatasetError::InvalidDataset(format!(
                    "segment {i} has {} frames, expected {}",
                    matrix.len(),
                    shape.0
                )));
            }
            if let Some(frame) = matrix.iter().find(|frame| frame.len() != shape.1) {
                return Err(DatasetError::InvalidDataset(format!(
                    "segment {i} has a frame of {} coefficients, expected {}",
                    frame.len(),
                    shape.1
                )));
            }
        }

        Ok(Some(shape))
    }

    /// Number of segments per label, indexed like `mapping`.
    pub fn segments_per_genre(&self) -> Vec<usize> {
        let mut counts = vec![0; self.mapping.len()];
        for &label in &self.labels {
            if let Some(c) = counts.get_mut(label) {
                *c += 1;
            }
        }
        counts
    }

    /// Features as a (segments, frames, coefficients) array and labels as a
    /// parallel vector.
    pub fn to_arrays(&self) -> Result<(Array3<f32>, Array1<usize>)> {
        let (frames, coeffs) = self.validate()?.unwrap_or((0, 0));

        let flat: Vec<f32> = self.features.iter().flatten().flatten().copied().collect();
        let features = Array3::from_shape_vec((self.features.len(), frames, coeffs), flat)
            .map_err(|e| DatasetError::InvalidDataset(e.to_string()))?;

        Ok((features, Array1::from_vec(self.labels.clone())))
    }

    /// Writes the dataset as 4-space indented JSON, replacing `path`.
    ///
    /// The JSON goes to a sibling temporary file that is renamed over `path`
    /// once fully written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = temp_path(path);
        let io_err = |p: &Path| {
            let p = p.to_path_buf();
            move |source: std::io::Error| DatasetError::Io { path: p, source }
        };

        let file = File::create(&tmp).map_err(io_err(&tmp))?;
        let mut writer = BufWriter::new(file);

        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
        let written = self
            .serialize(&mut ser)
            .map_err(|source| DatasetError::Json {
                path: tmp.clone(),
                source,
            })
            .and_then(|()| writer.flush().map_err(io_err(&tmp)));

        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        drop(writer);

        std::fs::rename(&tmp, path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            DatasetError::Io {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}
