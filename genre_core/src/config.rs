use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// What to do when `sample_rate * track_duration_secs` does not split into
/// `num_segments` whole segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemainderPolicy {
    /// Floor the segment length; the leftover tail samples are never read.
    #[default]
    Truncate,
    /// Refuse the configuration.
    Reject,
}

/// What to do with a segment whose MFCC frame count differs from the
/// expected count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthMismatchPolicy {
    /// Leave the segment out of the dataset and count it as dropped.
    #[default]
    Drop,
    /// Fail the whole run.
    Abort,
}

impl FromStr for RemainderPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "truncate" => Ok(Self::Truncate),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown remainder policy '{other}' (truncate|reject)")),
        }
    }
}

impl FromStr for LengthMismatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown length mismatch policy '{other}' (drop|abort)")),
        }
    }
}

impl fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Truncate => "truncate",
            Self::Reject => "reject",
        })
    }
}

impl fmt::Display for LengthMismatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Drop => "drop",
            Self::Abort => "abort",
        })
    }
}

/// Audio and MFCC parameters for one dataset build.
///
/// Defaults reproduce the GTZAN setup: 30 s tracks at 22050 Hz cut into five
/// segments, 13 coefficients from a 2048-point FFT with hop 512.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub sample_rate: u32,
    pub track_duration_secs: u32,
    pub num_segments: usize,
    pub n_mfcc: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    /// Dynamic range kept below the loudest mel bin, in dB.
    pub top_db: f32,
    pub remainder: RemainderPolicy,
    pub on_length_mismatch: LengthMismatchPolicy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            track_duration_secs: 30,
            num_segments: 5,
            n_mfcc: 13,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            top_db: 80.0,
            remainder: RemainderPolicy::Truncate,
            on_length_mismatch: LengthMismatchPolicy::Drop,
        }
    }
}

/// Sample and frame counts derived from an [`ExtractionConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLayout {
    pub samples_per_track: usize,
    pub samples_per_segment: usize,
    pub expected_frame_count: usize,
    /// Samples at the end of a full-length track that belong to no segment.
    pub leftover_samples: usize,
}

impl ExtractionConfig {
    /// Checks every parameter and derives the segment layout.
    pub fn layout(&self) -> Result<SegmentLayout> {
        let positive = [
            ("sample_rate", self.sample_rate as usize),
            ("track_duration_secs", self.track_duration_secs as usize),
            ("num_segments", self.num_segments),
            ("n_mfcc", self.n_mfcc),
            ("n_fft", self.n_fft),
            ("hop_length", self.hop_length),
            ("n_mels", self.n_mels),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(DatasetError::Config(format!("{name} must be greater than zero")));
        }

        if self.n_fft % 2 != 0 {
            return Err(DatasetError::Config(format!(
                "n_fft must be even, got {}",
                self.n_fft
            )));
        }
        if self.n_mfcc > self.n_mels {
            return Err(DatasetError::Config(format!(
                "n_mfcc ({}) cannot exceed n_mels ({})",
                self.n_mfcc, self.n_mels
            )));
        }
        if !self.top_db.is_finite() || self.top_db < 0.0 {
            return Err(DatasetError::Config(format!(
                "top_db must be a non-negative number, got {}",
                self.top_db
            )));
        }

        let samples_per_track = self.sample_rate as usize * self.track_duration_secs as usize;
        let leftover_samples = samples_per_track % self.num_segments;
        if leftover_samples != 0 && self.remainder == RemainderPolicy::Reject {
            return Err(DatasetError::Config(format!(
                "{samples_per_track} samples per track do not split into {} whole segments",
                self.num_segments
            )));
        }

        let samples_per_segment = samples_per_track / self.num_segments;
        if samples_per_segment == 0 {
            return Err(DatasetError::Config(format!(
                "{} segments leave no samples per segment",
                self.num_segments
            )));
        }

        // A centered STFT yields `1 + len / hop` frames, which equals
        // ceil(len / hop) only when hop does not divide len.
        if samples_per_segment % self.hop_length == 0 {
            return Err(DatasetError::Config(format!(
                "segment length {samples_per_segment} is a multiple of hop_length {}; \
                 no segment would ever match the expected frame count",
                self.hop_length
            )));
        }

        Ok(SegmentLayout {
            samples_per_track,
            samples_per_segment,
            expected_frame_count: samples_per_segment.div_ceil(self.hop_length),
            leftover_samples,
        })
    }
}

/// Contents of a TOML job file.
///
/// ```toml
/// dataset_path = "genres"
/// output_path = "data.json"
///
/// [extraction]
/// sample_rate = 22050
/// num_segments = 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub dataset_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub extraction: ExtractionConfig,
}

impl JobConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| DatasetError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|e| match e {
            DatasetError::Config(msg) => {
                DatasetError::Config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }
}
