//! WAV file standing in for the microphone on hosts without capture hardware.

use crate::audio::{AudioDriver, ChannelExtractor};
use crate::error::{EdgeError, Result};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct WavAudioConfig {
    /// Start over at the beginning instead of failing at end of file
    pub looping: bool,
    /// Sleep for the duration of each chunk to mimic a live device
    pub realtime: bool,
}

pub struct WavAudioDriver {
    config: WavAudioConfig,
    samples: Vec<i16>,
    file_rate: u32,
    position: usize,
    requested: Option<usize>,
    initialized: bool,
}

impl WavAudioDriver {
    pub fn open<P: AsRef<Path>>(path: P, config: WavAudioConfig) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path).map_err(|e| {
            EdgeError::Audio(format!("Failed to open WAV {}: {}", path.display(), e))
        })?;

        let spec = reader.spec();
        log::info!("WAV file spec: {:?}", spec);

        let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => reader
                .samples::<i16>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| EdgeError::Audio(format!("Failed to read WAV samples: {}", e)))?,
            (hound::SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| EdgeError::Audio(format!("Failed to read WAV samples: {}", e)))?,
            (format, bits) => {
                return Err(EdgeError::Audio(format!(
                    "Unsupported WAV sample format {:?} with {} bits",
                    format, bits
                )))
            }
        };

        let extractor = ChannelExtractor::new(0, spec.channels as usize)?;
        let samples = extractor.extract_channel(&interleaved);
        log::info!(
            "Loaded {} samples ({:.2}s) from {}",
            samples.len(),
            samples.len() as f32 / spec.sample_rate as f32,
            path.display()
        );

        Ok(Self::from_samples(samples, spec.sample_rate, config))
    }

    pub fn from_samples(samples: Vec<i16>, sample_rate: u32, config: WavAudioConfig) -> Self {
        Self {
            config,
            samples,
            file_rate: sample_rate,
            position: 0,
            requested: None,
            initialized: false,
        }
    }

    /// Samples not yet delivered
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl AudioDriver for WavAudioDriver {
    fn init(&mut self, sample_rate: u32) -> Result<()> {
        if sample_rate != self.file_rate {
            return Err(EdgeError::Audio(format!(
                "WAV sample rate {} Hz does not match requested {} Hz",
                self.file_rate, sample_rate
            )));
        }
        self.initialized = true;
        Ok(())
    }

    fn request_chunk(&mut self, len: usize) -> Result<()> {
        if !self.initialized {
            return Err(EdgeError::Audio("Audio driver not initialized".to_string()));
        }
        self.requested = Some(len);
        Ok(())
    }

    fn wait_for_chunk(&mut self, buffer: &mut [i16]) -> Result<()> {
        let len = self
            .requested
            .take()
            .ok_or_else(|| EdgeError::Audio("No capture in progress".to_string()))?;
        if len != buffer.len() {
            return Err(EdgeError::Audio(format!(
                "Requested {} samples but buffer holds {}",
                len,
                buffer.len()
            )));
        }

        if self.remaining() < len {
            if self.config.looping && self.samples.len() >= len {
                log::debug!("End of WAV reached, looping");
                self.position = 0;
            } else {
                return Err(EdgeError::Audio("End of audio stream".to_string()));
            }
        }

        buffer.copy_from_slice(&self.samples[self.position..self.position + len]);
        self.position += len;

        if self.config.realtime {
            std::thread::sleep(Duration::from_secs_f64(len as f64 / self.file_rate as f64));
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.requested = None;
    }
}
