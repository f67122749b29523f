//! Camera driver seam and a frame-sequence camera for hosts and tests.

use crate::error::{EdgeError, Result};
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum CameraMode {
    /// One frame per `start()`
    #[strum(serialize = "single-frame")]
    SingleFrame,
    #[strum(serialize = "continuous")]
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ColourFormat {
    #[strum(serialize = "rgb888")]
    Rgb888,
    #[strum(serialize = "raw8")]
    Raw8,
}

impl ColourFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ColourFormat::Rgb888 => 3,
            ColourFormat::Raw8 => 1,
        }
    }
}

pub trait CameraDriver {
    fn init(&mut self) -> Result<()>;

    fn configure(
        &mut self,
        cols: usize,
        rows: usize,
        mode: CameraMode,
        format: ColourFormat,
    ) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    /// The captured frame, or `None` when no frame is available
    fn captured_frame(&mut self) -> Option<&[u8]>;
}

enum FrameSource {
    Memory(Vec<Vec<u8>>),
    Files(Vec<PathBuf>),
}

impl FrameSource {
    fn len(&self) -> usize {
        match self {
            FrameSource::Memory(frames) => frames.len(),
            FrameSource::Files(paths) => paths.len(),
        }
    }
}

/// Replays a fixed list of raw frames; runs dry once every frame was shown
pub struct FrameSequenceCamera {
    source: FrameSource,
    cursor: usize,
    looping: bool,
    expected_len: Option<usize>,
    mode: CameraMode,
    armed: bool,
    current: Vec<u8>,
}

impl FrameSequenceCamera {
    pub fn from_frames(frames: Vec<Vec<u8>>) -> Self {
        Self::with_source(FrameSource::Memory(frames))
    }

    /// Every `.rgb` / `.raw` file in `dir`, in file name order
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("rgb") | Some("raw")
                )
            })
            .collect();
        paths.sort();
        log::info!("Found {} frames in {}", paths.len(), dir.display());
        Ok(Self::with_source(FrameSource::Files(paths)))
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    fn with_source(source: FrameSource) -> Self {
        Self {
            source,
            cursor: 0,
            looping: false,
            expected_len: None,
            mode: CameraMode::SingleFrame,
            armed: false,
            current: Vec::new(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.cursor >= self.source.len() {
            if self.looping && self.source.len() > 0 {
                self.cursor = 0;
            } else {
                return Ok(None);
            }
        }
        let frame = match &self.source {
            FrameSource::Memory(frames) => frames[self.cursor].clone(),
            FrameSource::Files(paths) => std::fs::read(&paths[self.cursor])?,
        };
        self.cursor += 1;
        Ok(Some(frame))
    }
}

impl CameraDriver for FrameSequenceCamera {
    fn init(&mut self) -> Result<()> {
        self.armed = false;
        Ok(())
    }

    fn configure(
        &mut self,
        cols: usize,
        rows: usize,
        mode: CameraMode,
        format: ColourFormat,
    ) -> Result<()> {
        if cols == 0 || rows == 0 {
            return Err(EdgeError::Camera(format!(
                "Invalid frame geometry {}x{}",
                cols, rows
            )));
        }
        self.expected_len = Some(cols * rows * format.bytes_per_pixel());
        self.mode = mode;
        log::debug!("Camera configured: {}x{} {} {}", cols, rows, mode, format);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.expected_len.is_none() {
            return Err(EdgeError::Camera("Camera started before configure".to_string()));
        }
        self.armed = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.armed = false;
    }

    fn captured_frame(&mut self) -> Option<&[u8]> {
        if !self.armed {
            return None;
        }
        if self.mode == CameraMode::SingleFrame {
            self.armed = false;
        }

        loop {
            match self.next_frame() {
                Ok(Some(frame)) => {
                    if Some(frame.len()) != self.expected_len {
                        log::warn!(
                            "Skipping frame of {} bytes (expected {:?})",
                            frame.len(),
                            self.expected_len
                        );
                        if !self.looping {
                            continue;
                        }
                        return None;
                    }
                    self.current = frame;
                    return Some(&self.current);
                }
                Ok(None) => return None,
                Err(e) => {
                    log::warn!("Failed to read frame: {}", e);
                    return None;
                }
            }
        }
    }
}
