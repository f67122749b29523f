use crate::error::{EdgeError, Result};

/// Extracts a specific channel from interleaved multi-channel audio
#[derive(Clone, Debug)]
pub struct ChannelExtractor {
    target_channel: usize,
    total_channels: usize,
}

impl ChannelExtractor {
    pub fn new(target_channel: usize, total_channels: usize) -> Result<Self> {
        if target_channel >= total_channels {
            return Err(EdgeError::Audio(format!(
                "Target channel {} is out of range for {} channels",
                target_channel, total_channels
            )));
        }

        Ok(Self {
            target_channel,
            total_channels,
        })
    }

    /// Extract the target channel from interleaved samples
    pub fn extract_channel<T: Copy>(&self, interleaved_samples: &[T]) -> Vec<T> {
        if self.total_channels == 1 {
            interleaved_samples.to_vec()
        } else {
            interleaved_samples
                .iter()
                .skip(self.target_channel)
                .step_by(self.total_channels)
                .copied()
                .collect()
        }
    }
}
