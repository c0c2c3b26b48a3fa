//! End-to-end dataset builds over generated WAV trees.

use std::fs;
use std::path::Path;

use genre_core::{
    DatasetBuilder, DatasetError, ExtractionConfig, GenreDataset, LengthMismatchPolicy,
};

const RATE: u32 = 8000;

/// 2 s tracks at 8 kHz in four 4000-sample segments, 8 frames each.
fn small_config() -> ExtractionConfig {
    ExtractionConfig {
        sample_rate: RATE,
        track_duration_secs: 2,
        num_segments: 4,
        n_mfcc: 13,
        n_fft: 1024,
        hop_length: 512,
        n_mels: 40,
        ..Default::default()
    }
}

fn write_tone(path: &Path, rate: u32, channels: u16, seconds: f32, freq: f32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let spec = hound::WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let total = (seconds * rate as f32) as usize;
    for i in 0..total {
        let t = i as f32 / rate as f32;
        let sample = (0.3 * (2.0 * std::f32::consts::PI * freq * t).sin() * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn assert_consistent(ds: &GenreDataset, frames: usize, coeffs: usize) {
    assert_eq!(ds.features.len(), ds.labels.len());
    assert!(ds.labels.iter().all(|&l| l < ds.mapping.len()));
    for matrix in &ds.features {
        assert_eq!(matrix.len(), frames);
        assert!(matrix.iter().all(|frame| frame.len() == coeffs));
    }
    ds.validate().unwrap();
}

#[test]
fn two_genres_produce_ordered_mapping_and_labels() {
    let root = tempfile::tempdir().unwrap();
    write_tone(&root.path().join("rock/riff.wav"), RATE, 1, 2.0, 880.0);
    write_tone(&root.path().join("jazz/sax.wav"), RATE, 1, 2.0, 220.0);

    let builder = DatasetBuilder::new(small_config()).unwrap();
    let (ds, report) = builder.build(root.path()).unwrap();

    assert_eq!(ds.mapping, vec!["jazz", "rock"]);
    assert_eq!(ds.labels, vec![0, 0, 0, 0, 1, 1, 1, 1]);
    assert_consistent(&ds, 8, 13);
    assert_eq!(report.genres, 2);
    assert_eq!(report.tracks, 2);
    assert_eq!(report.segments_accepted, 8);
    assert_eq!(report.segments_dropped, 0);
}

#[test]
fn empty_genre_is_mapped_without_segments() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir(root.path().join("blues")).unwrap();
    write_tone(&root.path().join("classical/etude.wav"), RATE, 1, 2.0, 440.0);

    let (ds, _) = DatasetBuilder::new(small_config())
        .unwrap()
        .build(root.path())
        .unwrap();

    assert_eq!(ds.mapping, vec!["blues", "classical"]);
    assert_eq!(ds.segments_per_genre(), vec![0, 4]);
    assert!(ds.labels.iter().all(|&l| l == 1));
}

#[test]
fn short_final_segment_is_dropped() {
    let root = tempfile::tempdir().unwrap();
    // 15200 samples: the last segment holds 3200 samples and 7 frames.
    write_tone(&root.path().join("pop/short.wav"), RATE, 1, 1.9, 440.0);

    let (ds, report) = DatasetBuilder::new(small_config())
        .unwrap()
        .build(root.path())
        .unwrap();

    assert_eq!(ds.len(), 3);
    assert_eq!(report.segments_accepted, 3);
    assert_eq!(report.segments_dropped, 1);
    assert_consistent(&ds, 8, 13);
}

#[test]
fn abort_policy_turns_short_segment_into_error() {
    let root = tempfile::tempdir().unwrap();
    write_tone(&root.path().join("pop/short.wav"), RATE, 1, 1.9, 440.0);

    let config = ExtractionConfig {
        on_length_mismatch: LengthMismatchPolicy::Abort,
        ..small_config()
    };
    let err = DatasetBuilder::new(config)
        .unwrap()
        .build(root.path())
        .unwrap_err();

    match err {
        DatasetError::LengthMismatch {
            segment,
            expected,
            actual,
            ..
        } => {
            assert_eq!(segment, 3);
            assert_eq!(expected, 8);
            assert_eq!(actual, 7);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn corrupt_file_aborts_without_writing_output() {
    let root = tempfile::tempdir().unwrap();
    write_tone(&root.path().join("disco/good.wav"), RATE, 1, 2.0, 440.0);
    fs::write(root.path().join("disco/zz_broken.wav"), b"definitely not audio").unwrap();

    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("data.json");

    let err = DatasetBuilder::new(small_config())
        .unwrap()
        .run(root.path(), &output)
        .unwrap_err();

    match err {
        DatasetError::Decode { path, .. } => assert!(path.ends_with("disco/zz_broken.wav")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
    assert_eq!(fs::read_dir(out_dir.path()).unwrap().count(), 0);
}

#[test]
fn builds_are_repeatable() {
    let root = tempfile::tempdir().unwrap();
    write_tone(&root.path().join("hiphop/beat.wav"), RATE, 1, 2.0, 330.0);
    write_tone(&root.path().join("reggae/skank.wav"), RATE, 1, 2.0, 660.0);

    let builder = DatasetBuilder::new(small_config()).unwrap();
    let (first, _) = builder.build(root.path()).unwrap();
    let (second, _) = builder.build(root.path()).unwrap();

    assert_eq!(first.mapping, second.mapping);
    assert_eq!(first.labels, second.labels);
    let max_diff = first
        .features
        .iter()
        .flatten()
        .flatten()
        .zip(second.features.iter().flatten().flatten())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    assert!(max_diff < 1e-5);
}

#[test]
fn traversal_skips_root_files_and_hidden_entries() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("readme.txt"), "not a genre").unwrap();
    write_tone(&root.path().join(".cache/ignored.wav"), RATE, 1, 2.0, 440.0);
    write_tone(&root.path().join("jazz/a.wav"), RATE, 1, 2.0, 440.0);
    fs::write(root.path().join("jazz/.DS_Store"), b"junk").unwrap();
    write_tone(&root.path().join("rock/c.wav"), RATE, 1, 2.0, 440.0);
    write_tone(&root.path().join("rock/classic/b.wav"), RATE, 1, 2.0, 440.0);

    let (ds, report) = DatasetBuilder::new(small_config())
        .unwrap()
        .build(root.path())
        .unwrap();

    assert_eq!(ds.mapping, vec!["jazz", "rock", "rock/classic"]);
    assert_eq!(ds.segments_per_genre(), vec![4, 4, 4]);
    assert_eq!(report.tracks, 3);
}

#[test]
fn stereo_file_at_other_rate_is_downmixed_and_resampled() {
    let root = tempfile::tempdir().unwrap();
    write_tone(&root.path().join("soul/stereo.wav"), 16_000, 2, 2.5, 440.0);

    let (ds, report) = DatasetBuilder::new(small_config())
        .unwrap()
        .build(root.path())
        .unwrap();

    assert_eq!(report.segments_accepted, 4);
    assert_consistent(&ds, 8, 13);
}

#[test]
fn run_writes_loadable_json() {
    let root = tempfile::tempdir().unwrap();
    write_tone(&root.path().join("metal/chug.wav"), RATE, 1, 2.0, 110.0);
    let output = root.path().join("data.json");
    fs::write(&output, "old contents").unwrap();

    let report = DatasetBuilder::new(small_config())
        .unwrap()
        .run(root.path(), &output)
        .unwrap();
    assert_eq!(report.segments_accepted, 4);

    let text = fs::read_to_string(&output).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["mapping"], serde_json::json!(["metal"]));
    assert_eq!(value["labels"], serde_json::json!([0, 0, 0, 0]));
    assert_eq!(value["mfcc"].as_array().unwrap().len(), 4);

    let loaded = GenreDataset::load(&output).unwrap();
    let (x, y) = loaded.to_arrays().unwrap();
    assert_eq!(x.dim(), (4, 8, 13));
    assert_eq!(y.len(), 4);
}

#[test]
fn gtzan_sized_tracks_fill_ten_segments() {
    let root = tempfile::tempdir().unwrap();
    write_tone(&root.path().join("jazz/one.wav"), 22050, 1, 30.0, 440.0);
    write_tone(&root.path().join("rock/two.wav"), 22050, 1, 30.0, 523.0);

    let (ds, _) = DatasetBuilder::new(ExtractionConfig::default())
        .unwrap()
        .build(root.path())
        .unwrap();

    assert_eq!(ds.mapping, vec!["jazz", "rock"]);
    assert!(ds.labels.iter().all(|&l| l == 0 || l == 1));
    assert!(ds.len() <= 10);
    assert_eq!(ds.len(), 10);
    assert_consistent(&ds, 259, 13);
}

#[test]
fn truncated_layout_still_accepts_every_segment() {
    let root = tempfile::tempdir().unwrap();
    write_tone(&root.path().join("funk/groove.wav"), RATE, 1, 2.0, 440.0);

    // 16000 samples in three segments: 5333 each, one sample left over.
    let config = ExtractionConfig {
        num_segments: 3,
        ..small_config()
    };
    let builder = DatasetBuilder::new(config).unwrap();
    let layout = builder.layout();
    assert_eq!(layout.samples_per_segment, 5333);
    assert_eq!(layout.leftover_samples, 1);
    assert_eq!(layout.expected_frame_count, 11);

    let (ds, report) = builder.build(root.path()).unwrap();
    assert_eq!(report.segments_accepted, 3);
    assert_eq!(report.segments_dropped, 0);
    assert_consistent(&ds, 11, 13);
}
