use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::config::ExtractionConfig;

const AMIN: f64 = 1e-10;

/// Reusable MFCC extractor: FFT plan, window, mel filterbank and DCT basis
/// are computed once per configuration.
///
/// Output follows the usual librosa defaults: centered STFT with zero
/// padding, periodic Hann window, power spectrum, Slaney mel filterbank,
/// power-to-dB with a `top_db` floor, orthonormal DCT-II.
pub struct MfccExtractor {
    n_fft: usize,
    hop_length: usize,
    top_db: f64,
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    /// (n_mels, n_fft / 2 + 1)
    mel_basis: Array2<f64>,
    /// (n_mfcc, n_mels)
    dct_basis: Array2<f64>,
}

impl MfccExtractor {
    /// The configuration is expected to have passed
    /// [`ExtractionConfig::layout`].
    pub fn new(config: &ExtractionConfig) -> Self {
        let n_fft = config.n_fft;
        let mut planner = FftPlanner::<f64>::new();

        Self {
            n_fft,
            hop_length: config.hop_length,
            top_db: f64::from(config.top_db),
            fft: planner.plan_fft_forward(n_fft),
            window: hann_window(n_fft),
            mel_basis: mel_spec::mel::mel(
                f64::from(config.sample_rate),
                n_fft,
                config.n_mels,
                None,
                None,
                false,
                true,
            ),
            dct_basis: dct_ortho_basis(config.n_mfcc, config.n_mels),
        }
    }

    /// Number of frames the centered STFT produces for `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        if len == 0 { 0 } else { 1 + len / self.hop_length }
    }

    /// MFCC matrix of `signal`, shaped (frames, n_mfcc) with frames in time
    /// order. An empty signal yields zero frames.
    pub fn compute(&self, signal: &[f32]) -> Array2<f32> {
        let n_frames = self.frame_count(signal.len());
        let n_mfcc = self.dct_basis.nrows();
        if n_frames == 0 {
            return Array2::zeros((0, n_mfcc));
        }

        let log_mel = self.log_mel_frames(signal, n_frames);

        // (frames, n_mels) x (n_mels, n_mfcc)
        log_mel.dot(&self.dct_basis.t()).mapv(|v| v as f32)
    }

    /// Power mel spectrogram in dB, shaped (frames, n_mels).
    fn log_mel_frames(&self, signal: &[f32], n_frames: usize) -> Array2<f64> {
        let pad = self.n_fft / 2;
        let n_bins = self.n_fft / 2 + 1;

        let mut padded = vec![0.0f64; signal.len() + 2 * pad];
        for (dst, &src) in padded[pad..].iter_mut().zip(signal) {
            *dst = f64::from(src);
        }

        let mut buffer = vec![Complex::new(0.0, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0, 0.0); self.fft.get_inplace_scratch_len()];
        let mut power = Array1::<f64>::zeros(n_bins);
        let mut out = Array2::<f64>::zeros((n_frames, self.mel_basis.nrows()));

        for (t, mut row) in out.rows_mut().into_iter().enumerate() {
            let start = t * self.hop_length;
            let frame = &padded[start..start + self.n_fft];

            for ((b, &s), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *b = Complex::new(s * w, 0.0);
            }
            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (p, c) in power.iter_mut().zip(&buffer[..n_bins]) {
                *p = c.norm_sqr();
            }

            let mel = self.mel_basis.dot(&power);
            row.assign(&mel.mapv(|m| 10.0 * m.max(AMIN).log10()));
        }

        let peak = out.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let floor = peak - self.top_db;
        out.mapv_inplace(|v| v.max(floor));
        out
    }
}

/// Periodic Hann window.
fn hann_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// Rows of the orthonormal DCT-II matrix, truncated to `n_out` coefficients.
fn dct_ortho_basis(n_out: usize, n_in: usize) -> Array2<f64> {
    let n = n_in as f64;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()
    })
}
