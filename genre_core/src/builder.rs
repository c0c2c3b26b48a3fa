//! Walks a genre-labelled audio tree and turns every track into MFCC
//! segments.
//!
//! Each directory below the dataset root is one genre; its position in the
//! (sorted, depth-first) traversal is its label ID. Files directly inside the
//! root belong to no genre and are skipped.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::audio::{decoder, mfcc::MfccExtractor};
use crate::config::{ExtractionConfig, LengthMismatchPolicy, SegmentLayout};
use crate::dataset::GenreDataset;
use crate::error::{DatasetError, Result};

/// Counters collected during one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub genres: usize,
    pub tracks: usize,
    pub segments_accepted: usize,
    /// Segments left out because their frame count was off.
    pub segments_dropped: usize,
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} genres, {} tracks, {} segments accepted, {} dropped",
            self.genres, self.tracks, self.segments_accepted, self.segments_dropped
        )
    }
}

pub struct DatasetBuilder {
    config: ExtractionConfig,
    layout: SegmentLayout,
    extractor: MfccExtractor,
}

impl DatasetBuilder {
    /// Validates `config` and prepares the MFCC extractor.
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let layout = config.layout()?;
        if layout.leftover_samples > 0 {
            warn!(
                "{} samples per track do not split evenly into {} segments; \
                 the last {} samples of each track are ignored",
                layout.samples_per_track, config.num_segments, layout.leftover_samples
            );
        }

        Ok(Self {
            extractor: MfccExtractor::new(&config),
            config,
            layout,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn layout(&self) -> SegmentLayout {
        self.layout
    }

    /// Builds the dataset for `root` and writes it to `output`.
    ///
    /// Nothing is written unless the whole tree was processed.
    pub fn run(&self, root: &Path, output: &Path) -> Result<BuildReport> {
        let (dataset, report) = self.build(root)?;
        dataset.save(output)?;
        info!("Wrote {} ({report})", output.display());
        Ok(report)
    }

    /// Builds the dataset in memory.
    pub fn build(&self, root: &Path) -> Result<(GenreDataset, BuildReport)> {
        if !root.exists() {
            return Err(DatasetError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(DatasetError::NotADirectory(root.to_path_buf()));
        }

        let mut dataset = GenreDataset::new();
        let mut report = BuildReport::default();
        let mut genre_dirs: HashMap<PathBuf, usize> = HashMap::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = entry.map_err(|source| DatasetError::Walk {
                path: source
                    .path()
                    .map_or_else(|| root.to_path_buf(), Path::to_path_buf),
                source,
            })?;
            let path = entry.path();

            if entry.file_type().is_dir() {
                let label = dataset.push_genre(genre_name(root, path))?;
                info!("Processing {} (label {label})", dataset.mapping[label]);
                genre_dirs.insert(path.to_path_buf(), label);
                report.genres += 1;
                continue;
            }

            match path.parent().and_then(|dir| genre_dirs.get(dir)) {
                Some(&label) => self.process_track(path, label, &mut dataset, &mut report)?,
                None => warn!("Skipping {}: not inside a genre directory", path.display()),
            }
        }

        info!("Built dataset: {report}");
        Ok((dataset, report))
    }

    fn process_track(
        &self,
        path: &Path,
        label: usize,
        dataset: &mut GenreDataset,
        report: &mut BuildReport,
    ) -> Result<()> {
        let signal = decoder::load_mono(path, self.config.sample_rate).map_err(|e| {
            DatasetError::Decode {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            }
        })?;
        report.tracks += 1;

        for (s, segment) in self.segments(&signal).enumerate() {
            let mfcc = self.extractor.compute(segment);

            if mfcc.nrows() == self.layout.expected_frame_count {
                dataset.push_segment(label, &mfcc);
                report.segments_accepted += 1;
                debug!("{}, segment:{s}", path.display());
                continue;
            }

            match self.config.on_length_mismatch {
                LengthMismatchPolicy::Drop => {
                    report.segments_dropped += 1;
                    debug!(
                        "{}, segment:{s} dropped ({} frames, expected {})",
                        path.display(),
                        mfcc.nrows(),
                        self.layout.expected_frame_count
                    );
                }
                LengthMismatchPolicy::Abort => {
                    return Err(DatasetError::LengthMismatch {
                        path: path.to_path_buf(),
                        segment: s,
                        expected: self.layout.expected_frame_count,
                        actual: mfcc.nrows(),
                    });
                }
            }
        }

        Ok(())
    }

    /// The `num_segments` consecutive slices of `signal`, each
    /// `samples_per_segment` long and clamped to the signal end. Slices past
    /// the end of a short track come back shorter or empty.
    pub fn segments<'a>(&self, signal: &'a [f32]) -> impl Iterator<Item = &'a [f32]> {
        let len = signal.len();
        let step = self.layout.samples_per_segment;
        (0..self.config.num_segments).map(move |s| {
            let start = (s * step).min(len);
            let end = (start + step).min(len);
            &signal[start..end]
        })
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Root-relative directory path with `/` separators; just the directory name
/// for immediate children of the root.
fn genre_name(root: &Path, dir: &Path) -> String {
    let relative = dir.strip_prefix(root).unwrap_or(dir);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
