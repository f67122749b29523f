//! MFCC front end for the keyword-spotting model.
//!
//! Per frame: Hamming window, zero-padded FFT, power spectrum, HTK mel
//! filterbank, natural log, DCT-II. The defaults match the MicroNet KWS
//! models (640-sample frames at 16 kHz, 40 mel bins over 20-4000 Hz, 10
//! coefficients).

use crate::error::{EdgeError, Result};
use crate::models::{TensorViewMut, INPUT_COLS_IDX, INPUT_ROWS_IDX};
use crate::processing::AudioPreProcess;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::Arc;

const LOG_FLOOR: f32 = 1e-16;

#[derive(Debug, Clone, PartialEq)]
pub struct MfccConfig {
    pub sample_rate: u32,
    pub frame_len: usize,
    pub num_mel_bins: usize,
    pub num_features: usize,
    pub low_freq: f32,
    pub high_freq: f32,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            frame_len: 640,
            num_mel_bins: 40,
            num_features: 10,
            low_freq: 20.0,
            high_freq: 4000.0,
        }
    }
}

impl MfccConfig {
    /// FFT size: the frame length rounded up to a power of two
    pub fn fft_len(&self) -> usize {
        self.frame_len.next_power_of_two()
    }
}

/// HTK mel scale
pub fn hz_to_mel(freq: f32) -> f32 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

fn hamming_window(len: usize) -> Vec<f32> {
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f32 / (len - 1) as f32).cos())
        .collect()
}

/// Triangular filters, one row of `fft_len / 2 + 1` weights per mel bin
fn mel_filter_bank(config: &MfccConfig) -> Vec<Vec<f32>> {
    let n_fft = config.fft_len();
    let n_freqs = n_fft / 2 + 1;
    let bin_hz = config.sample_rate as f32 / n_fft as f32;

    let mel_min = hz_to_mel(config.low_freq);
    let mel_max = hz_to_mel(config.high_freq);
    let step = (mel_max - mel_min) / (config.num_mel_bins + 1) as f32;
    let edges: Vec<f32> = (0..config.num_mel_bins + 2)
        .map(|i| mel_to_hz(mel_min + step * i as f32))
        .collect();

    (0..config.num_mel_bins)
        .map(|m| {
            let (lower, center, upper) = (edges[m], edges[m + 1], edges[m + 2]);
            (0..n_freqs)
                .map(|bin| {
                    let freq = bin as f32 * bin_hz;
                    if freq > lower && freq <= center {
                        (freq - lower) / (center - lower)
                    } else if freq > center && freq < upper {
                        (upper - freq) / (upper - center)
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

/// Orthogonal-scaled DCT-II basis, `num_features` rows of `num_mel_bins`
fn dct_matrix(num_features: usize, num_mel_bins: usize) -> Vec<Vec<f32>> {
    let norm = (2.0 / num_mel_bins as f32).sqrt();
    (0..num_features)
        .map(|k| {
            (0..num_mel_bins)
                .map(|n| norm * (PI / num_mel_bins as f32 * (n as f32 + 0.5) * k as f32).cos())
                .collect()
        })
        .collect()
}

pub struct Mfcc {
    config: MfccConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    filter_bank: Vec<Vec<f32>>,
    dct: Vec<Vec<f32>>,
    spectrum: Vec<Complex<f32>>,
    power: Vec<f32>,
    log_mel: Vec<f32>,
}

impl Mfcc {
    pub fn new(config: MfccConfig) -> Result<Self> {
        if config.frame_len == 0 || config.num_mel_bins == 0 || config.num_features == 0 {
            return Err(EdgeError::Config(
                "MFCC frame length, mel bins and features must be non-zero".to_string(),
            ));
        }
        if config.num_features > config.num_mel_bins {
            return Err(EdgeError::Config(format!(
                "Cannot take {} MFCC features from {} mel bins",
                config.num_features, config.num_mel_bins
            )));
        }
        let nyquist = config.sample_rate as f32 / 2.0;
        if !(config.low_freq >= 0.0 && config.low_freq < config.high_freq && config.high_freq <= nyquist) {
            return Err(EdgeError::Config(format!(
                "Invalid mel range {}-{} Hz at {} Hz",
                config.low_freq, config.high_freq, config.sample_rate
            )));
        }

        let n_fft = config.fft_len();
        let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);

        Ok(Self {
            fft,
            window: hamming_window(config.frame_len),
            filter_bank: mel_filter_bank(&config),
            dct: dct_matrix(config.num_features, config.num_mel_bins),
            spectrum: vec![Complex::new(0.0, 0.0); n_fft],
            power: vec![0.0; n_fft / 2 + 1],
            log_mel: vec![0.0; config.num_mel_bins],
            config,
        })
    }

    pub fn config(&self) -> &MfccConfig {
        &self.config
    }

    /// Coefficients of one frame of exactly `frame_len` samples
    pub fn compute(&mut self, frame: &[i16]) -> Result<Vec<f32>> {
        if frame.len() != self.config.frame_len {
            return Err(EdgeError::ProcessingError(format!(
                "MFCC frame has {} samples, expected {}",
                frame.len(),
                self.config.frame_len
            )));
        }

        for (slot, (&sample, &w)) in self.spectrum.iter_mut().zip(frame.iter().zip(&self.window)) {
            *slot = Complex::new(sample as f32 / 32768.0 * w, 0.0);
        }
        for slot in self.spectrum[frame.len()..].iter_mut() {
            *slot = Complex::new(0.0, 0.0);
        }

        self.fft.process(&mut self.spectrum);

        for (p, c) in self.power.iter_mut().zip(&self.spectrum) {
            *p = c.norm_sqr();
        }

        for (energy, filter) in self.log_mel.iter_mut().zip(&self.filter_bank) {
            let sum: f32 = filter.iter().zip(&self.power).map(|(w, p)| w * p).sum();
            *energy = sum.max(LOG_FLOOR).ln();
        }

        Ok(self
            .dct
            .iter()
            .map(|row| row.iter().zip(&self.log_mel).map(|(d, m)| d * m).sum())
            .collect())
    }
}

/// Fills the KWS input tensor (`[1, frames, features, 1]`) from an audio
/// window, reusing frames already computed for the previous window.
pub struct MfccPreProcessor {
    mfcc: Mfcc,
    frame_stride: usize,
    hop_len: usize,
    /// Features keyed by absolute sample offset of the frame start
    cache: HashMap<u64, Vec<f32>>,
    cache_hits: u64,
}

impl MfccPreProcessor {
    pub fn new(config: MfccConfig, frame_stride: usize, hop_len: usize) -> Result<Self> {
        if frame_stride == 0 {
            return Err(EdgeError::Config("MFCC frame stride must be non-zero".to_string()));
        }
        Ok(Self {
            mfcc: Mfcc::new(config)?,
            frame_stride,
            hop_len,
            cache: HashMap::new(),
            cache_hits: 0,
        })
    }

    /// Frames served from the cache since creation
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    pub fn cached_frames(&self) -> usize {
        self.cache.len()
    }
}

impl AudioPreProcess for MfccPreProcessor {
    fn process(&mut self, window: &[i16], index: u64, input: &mut TensorViewMut<'_>) -> Result<()> {
        let num_frames = input.spec().dim(INPUT_ROWS_IDX)?;
        let num_features = input.spec().dim(INPUT_COLS_IDX)?;
        if num_features != self.mfcc.config().num_features {
            return Err(EdgeError::InvalidInput(format!(
                "Model expects {} MFCC features, extractor produces {}",
                num_features,
                self.mfcc.config().num_features
            )));
        }

        let frame_len = self.mfcc.config().frame_len;
        let needed = (num_frames.saturating_sub(1)) * self.frame_stride + frame_len;
        if window.len() < needed {
            return Err(EdgeError::InvalidInput(format!(
                "{} MFCC frames need {} samples, window has {}",
                num_frames,
                needed,
                window.len()
            )));
        }

        let window_start = index * self.hop_len as u64;
        for frame in 0..num_frames {
            let start = frame * self.frame_stride;
            let key = window_start + start as u64;

            if let Some(features) = self.cache.get(&key) {
                self.cache_hits += 1;
                input.write_f32(frame * num_features, features)?;
                continue;
            }

            let features = self.mfcc.compute(&window[start..start + frame_len])?;
            input.write_f32(frame * num_features, &features)?;
            self.cache.insert(key, features);
        }

        self.cache.retain(|&key, _| key >= window_start + self.hop_len as u64);
        Ok(())
    }

    fn reset(&mut self) {
        log::debug!("Dropping {} cached MFCC frames", self.cache.len());
        self.cache.clear();
    }
}
