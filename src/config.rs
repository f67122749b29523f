use crate::detection::TriggerPolicy;
use crate::error::EdgeError;
use crate::processing::MfccConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<ConfigError> for EdgeError {
    fn from(e: ConfigError) -> Self {
        EdgeError::Config(e.to_string())
    }
}

/// Keyword-spotting pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KwsConfig {
    pub model: PathBuf,
    pub labels: PathBuf,
    pub sample_rate: u32,
    /// Samples per inference window
    pub window_len: usize,
    /// Samples the window slides per step
    pub hop_len: usize,
    pub frame_len: usize,
    pub frame_stride: usize,
    pub num_features: usize,
    pub num_mel_bins: usize,
    pub low_freq: f32,
    pub high_freq: f32,
    pub score_threshold: f32,
    /// Label that triggers image classification
    pub sentinel_label: String,
    pub trigger: TriggerPolicy,
}

impl Default for KwsConfig {
    fn default() -> Self {
        let mfcc = MfccConfig::default();
        Self {
            model: PathBuf::from("models/kws_micronet_m.tflite"),
            labels: PathBuf::from("models/kws_labels.txt"),
            sample_rate: mfcc.sample_rate,
            window_len: 16000,
            hop_len: 8000,
            frame_len: mfcc.frame_len,
            frame_stride: 320,
            num_features: mfcc.num_features,
            num_mel_bins: mfcc.num_mel_bins,
            low_freq: mfcc.low_freq,
            high_freq: mfcc.high_freq,
            score_threshold: 0.7,
            sentinel_label: "_silence_".to_string(),
            trigger: TriggerPolicy::LatestOnly,
        }
    }
}

impl KwsConfig {
    pub fn mfcc(&self) -> MfccConfig {
        MfccConfig {
            sample_rate: self.sample_rate,
            frame_len: self.frame_len,
            num_mel_bins: self.num_mel_bins,
            num_features: self.num_features,
            low_freq: self.low_freq,
            high_freq: self.high_freq,
        }
    }
}

/// Image classification burst settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub model: PathBuf,
    pub labels: PathBuf,
    /// Results below this score are reported as low confidence
    pub score_threshold: f32,
    /// Frames attempted per burst
    pub max_frames: usize,
    pub top_k: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/mobilenet_v2.tflite"),
            labels: PathBuf::from("models/img_labels.txt"),
            score_threshold: 0.5,
            max_frames: 5,
            top_k: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UseCaseConfig {
    /// Size of the tensor arena shared by both models
    pub arena_size: usize,
    pub kws: KwsConfig,
    pub image: ImageConfig,
    /// KWS results kept for display and debouncing
    pub history_capacity: usize,
    /// Pause after a burst that processed no frames
    pub settling_delay_ms: u64,
    /// Stop after one listening step
    pub single_shot: bool,
    pub thread_count: usize,
}

impl Default for UseCaseConfig {
    fn default() -> Self {
        Self {
            arena_size: 1 << 20,
            kws: KwsConfig::default(),
            image: ImageConfig::default(),
            history_capacity: 8,
            settling_delay_ms: 2000,
            single_shot: false,
            thread_count: 1,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl UseCaseConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn settling_delay(&self) -> Duration {
        Duration::from_millis(self.settling_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arena_size == 0 {
            return Err(invalid("arena_size", "must be non-zero"));
        }
        if self.history_capacity == 0 {
            return Err(invalid("history_capacity", "must be at least 1"));
        }
        if self.thread_count == 0 {
            return Err(invalid("thread_count", "must be at least 1"));
        }

        let kws = &self.kws;
        if kws.sample_rate == 0 {
            return Err(invalid("kws.sample_rate", "must be non-zero"));
        }
        if kws.hop_len == 0 || kws.hop_len > kws.window_len {
            return Err(invalid(
                "kws.hop_len",
                format!("{} must be in 1..={}", kws.hop_len, kws.window_len),
            ));
        }
        if kws.frame_len == 0 || kws.frame_len > kws.window_len {
            return Err(invalid(
                "kws.frame_len",
                format!("{} must be in 1..={}", kws.frame_len, kws.window_len),
            ));
        }
        if kws.frame_stride == 0 {
            return Err(invalid("kws.frame_stride", "must be non-zero"));
        }
        if !(0.0..=1.0).contains(&kws.score_threshold) {
            return Err(invalid("kws.score_threshold", "must be between 0.0 and 1.0"));
        }
        if kws.sentinel_label.is_empty() {
            return Err(invalid("kws.sentinel_label", "must not be empty"));
        }
        if let TriggerPolicy::Debounced { required } = kws.trigger {
            if required == 0 || required > self.history_capacity {
                return Err(invalid(
                    "kws.trigger.required",
                    format!("{} must be in 1..={}", required, self.history_capacity),
                ));
            }
        }

        let image = &self.image;
        if !(0.0..=1.0).contains(&image.score_threshold) {
            return Err(invalid("image.score_threshold", "must be between 0.0 and 1.0"));
        }
        if image.max_frames == 0 {
            return Err(invalid("image.max_frames", "must be at least 1"));
        }
        if image.top_k == 0 {
            return Err(invalid("image.top_k", "must be at least 1"));
        }
        Ok(())
    }
}
