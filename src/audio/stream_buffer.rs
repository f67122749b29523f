//! # Audio Stream Buffer
//!
//! Overlapping-window audio buffer of `window + hop` samples:
//!
//! ```text
//!  0                  S-H          S              S+H
//!  |  retained (S-H)   | newest hop |  capture region |
//!  |<------- inference window ----->|<- driver fills ->|
//! ```
//!
//! After the driver has filled the capture region, [`AudioStreamBuffer::advance`]
//! copies `[H, S+H)` down to `[0, S)`, so the window always holds the `S` most
//! recent samples. The next chunk is then requested into the tail while the
//! head is being processed.

use crate::audio::AudioDriver;
use crate::error::{EdgeError, Result};

pub struct AudioStreamBuffer {
    samples: Vec<i16>,
    window_len: usize,
    hop_len: usize,
    capture_pending: bool,
    chunk_ready: bool,
    hops_consumed: u64,
}

impl AudioStreamBuffer {
    pub fn new(window_len: usize, hop_len: usize) -> Result<Self> {
        if hop_len == 0 || window_len == 0 {
            return Err(EdgeError::Config(
                "Audio window and hop must be non-zero".to_string(),
            ));
        }
        if hop_len > window_len {
            return Err(EdgeError::Config(format!(
                "Audio hop {} is longer than the window {}",
                hop_len, window_len
            )));
        }

        Ok(Self {
            samples: vec![0; window_len + hop_len],
            window_len,
            hop_len,
            capture_pending: false,
            chunk_ready: false,
            hops_consumed: 0,
        })
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn hop_len(&self) -> usize {
        self.hop_len
    }

    /// Number of hops slid into the window so far
    pub fn hops_consumed(&self) -> u64 {
        self.hops_consumed
    }

    /// Whether a capture has been requested and not yet collected
    pub fn capture_pending(&self) -> bool {
        self.capture_pending
    }

    /// Request the very first chunk so the first advance has data to shift in
    pub fn prime(&mut self, driver: &mut dyn AudioDriver) -> Result<()> {
        self.request(driver)
    }

    /// Block until the pending chunk lands in the capture region
    pub fn wait_for_next_chunk(&mut self, driver: &mut dyn AudioDriver) -> Result<()> {
        if !self.capture_pending {
            return Err(EdgeError::Audio(
                "No audio capture was requested before waiting".to_string(),
            ));
        }

        let window_len = self.window_len;
        driver.wait_for_chunk(&mut self.samples[window_len..])?;
        self.capture_pending = false;
        self.chunk_ready = true;
        Ok(())
    }

    /// Drop the oldest hop and bring the captured chunk into the window
    pub fn advance(&mut self) -> Result<()> {
        if !self.chunk_ready {
            return Err(EdgeError::Audio(
                "Cannot advance audio window without a captured chunk".to_string(),
            ));
        }
        self.samples.copy_within(self.hop_len.., 0);
        self.chunk_ready = false;
        self.hops_consumed += 1;
        Ok(())
    }

    /// Start capturing the following chunk and condition the newest hop
    pub fn request_next(&mut self, driver: &mut dyn AudioDriver) -> Result<()> {
        self.request(driver)?;
        let newest = self.window_len - self.hop_len..self.window_len;
        driver.condition(&mut self.samples[newest]);
        Ok(())
    }

    /// The current inference window
    pub fn window(&self) -> &[i16] {
        &self.samples[..self.window_len]
    }

    /// Restart streaming after a pause in capture
    ///
    /// Retained samples predate the pause, so they are cleared rather than
    /// spliced onto the fresh audio; a new chunk is requested.
    pub fn resume(&mut self, driver: &mut dyn AudioDriver) -> Result<()> {
        self.samples.fill(0);
        self.chunk_ready = false;
        self.capture_pending = false;
        self.request(driver)
    }

    /// Forget any in-flight capture (the driver has been stopped)
    pub fn abandon_capture(&mut self) {
        self.capture_pending = false;
        self.chunk_ready = false;
    }

    fn request(&mut self, driver: &mut dyn AudioDriver) -> Result<()> {
        driver.request_chunk(self.hop_len)?;
        self.capture_pending = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Produces a ramp: sample n has value n (wrapping)
    struct RampDriver {
        next: i64,
        requested: Option<usize>,
        conditioned: Vec<usize>,
    }

    impl RampDriver {
        fn new() -> Self {
            Self {
                next: 0,
                requested: None,
                conditioned: Vec::new(),
            }
        }
    }

    impl AudioDriver for RampDriver {
        fn init(&mut self, _sample_rate: u32) -> Result<()> {
            Ok(())
        }

        fn request_chunk(&mut self, len: usize) -> Result<()> {
            self.requested = Some(len);
            Ok(())
        }

        fn wait_for_chunk(&mut self, buffer: &mut [i16]) -> Result<()> {
            let len = self
                .requested
                .take()
                .ok_or_else(|| EdgeError::Audio("nothing requested".to_string()))?;
            assert_eq!(len, buffer.len());
            for sample in buffer.iter_mut() {
                *sample = (self.next % 30000) as i16;
                self.next += 1;
            }
            Ok(())
        }

        fn stop(&mut self) {
            self.requested = None;
        }

        fn condition(&mut self, samples: &mut [i16]) {
            self.conditioned.push(samples.len());
        }
    }

    fn step(buffer: &mut AudioStreamBuffer, driver: &mut RampDriver) {
        buffer.wait_for_next_chunk(driver).unwrap();
        buffer.advance().unwrap();
        buffer.request_next(driver).unwrap();
    }

    #[test]
    fn test_rejects_bad_geometry() {
        assert!(AudioStreamBuffer::new(0, 0).is_err());
        assert!(AudioStreamBuffer::new(100, 200).is_err());
        assert!(AudioStreamBuffer::new(100, 100).is_ok());
    }

    #[test]
    fn test_newest_hop_sits_at_end_of_window() {
        let mut driver = RampDriver::new();
        let mut buffer = AudioStreamBuffer::new(8, 4).unwrap();
        buffer.prime(&mut driver).unwrap();

        step(&mut buffer, &mut driver);
        assert_eq!(buffer.window(), &[0, 0, 0, 0, 0, 1, 2, 3]);

        step(&mut buffer, &mut driver);
        assert_eq!(buffer.window(), &[0, 1, 2, 3, 4, 5, 6, 7]);

        step(&mut buffer, &mut driver);
        assert_eq!(buffer.window(), &[4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(buffer.hops_consumed(), 3);
        assert_eq!(driver.conditioned, vec![4, 4, 4]);
    }

    #[test]
    fn test_wait_without_request_fails() {
        let mut driver = RampDriver::new();
        let mut buffer = AudioStreamBuffer::new(8, 4).unwrap();
        assert!(buffer.wait_for_next_chunk(&mut driver).is_err());
        assert!(buffer.advance().is_err());
    }

    #[test]
    fn test_resume_clears_retained_audio() {
        let mut driver = RampDriver::new();
        let mut buffer = AudioStreamBuffer::new(8, 4).unwrap();
        buffer.prime(&mut driver).unwrap();
        step(&mut buffer, &mut driver);
        step(&mut buffer, &mut driver);

        driver.stop();
        buffer.abandon_capture();
        buffer.resume(&mut driver).unwrap();
        assert!(buffer.capture_pending());
        assert!(buffer.window().iter().all(|&s| s == 0));

        step(&mut buffer, &mut driver);
        assert_eq!(buffer.window(), &[0, 0, 0, 0, 8, 9, 10, 11]);
    }
}
