//! MFCC dataset extraction for music-genre classification.
//!
//! [`DatasetBuilder`] walks a directory tree where every subdirectory is a
//! genre, cuts each track into fixed-length segments, computes an MFCC matrix
//! per segment and collects the result in a [`GenreDataset`] that is written
//! as JSON.

pub mod audio;
pub mod builder;
pub mod config;
pub mod dataset;
pub mod error;

pub use builder::{BuildReport, DatasetBuilder};
pub use config::{ExtractionConfig, JobConfig, LengthMismatchPolicy, RemainderPolicy, SegmentLayout};
pub use dataset::GenreDataset;
pub use error::{DatasetError, Result};
