pub mod channel;
pub mod stream_buffer;
pub mod wav_source;

pub use channel::ChannelExtractor;
pub use stream_buffer::AudioStreamBuffer;
pub use wav_source::{WavAudioConfig, WavAudioDriver};

use crate::error::Result;

/// Audio capture device delivering 16-bit mono chunks
///
/// Capture is split in two: `request_chunk` starts filling the next `len`
/// samples in the background and `wait_for_chunk` blocks until they are
/// available, so processing of the previous window overlaps with capture.
pub trait AudioDriver {
    /// Bring up the device at `sample_rate`. Called once per process.
    fn init(&mut self, sample_rate: u32) -> Result<()>;

    /// Start capturing the next `len` samples
    fn request_chunk(&mut self, len: usize) -> Result<()>;

    /// Block until the requested chunk is captured and copy it into `buffer`.
    /// Any error is unrecoverable for the stream.
    fn wait_for_chunk(&mut self, buffer: &mut [i16]) -> Result<()>;

    /// Halt capture; an outstanding request is discarded
    fn stop(&mut self);

    /// Device-specific conditioning of freshly captured samples
    fn condition(&mut self, _samples: &mut [i16]) {}
}
