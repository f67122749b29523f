//! Pre- and post-processing stages around model inference.
//!
//! Every stage receives the tensor view it works on per call and never keeps
//! it; views are only valid while the arena claim that produced them lasts.

pub mod classifier;
pub mod image;
pub mod mfcc;

pub use classifier::ClassifierPostProcess;
pub use image::ImagePreProcessor;
pub use mfcc::{Mfcc, MfccConfig, MfccPreProcessor};

use crate::error::{EdgeError, Result};
use crate::models::{TensorView, TensorViewMut};
use std::path::Path;

/// One scored label
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub score: f32,
    /// Position of the label in the model output
    pub index: usize,
}

/// Turns one audio window into the model input
pub trait AudioPreProcess {
    /// `index` counts windows since streaming started; consecutive windows
    /// are one hop apart.
    fn process(&mut self, window: &[i16], index: u64, input: &mut TensorViewMut<'_>) -> Result<()>;

    /// Forget anything carried over from earlier windows
    fn reset(&mut self) {}
}

/// Turns one camera frame into the model input
pub trait ImagePreProcess {
    fn process(&mut self, frame: &[u8], input: &mut TensorViewMut<'_>) -> Result<()>;
}

/// Scores the model output; results are sorted by score, best first
pub trait PostProcess {
    fn process(&mut self, output: &TensorView<'_>) -> Result<Vec<Classification>>;
}

/// Read a label file with one label per line
pub fn load_labels<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        EdgeError::Config(format!("Failed to read labels {}: {}", path.display(), e))
    })?;

    let labels: Vec<String> = text
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if labels.is_empty() {
        return Err(EdgeError::Config(format!(
            "Label file {} is empty",
            path.display()
        )));
    }
    log::info!("Loaded {} labels from {}", labels.len(), path.display());
    Ok(labels)
}
