use thiserror::Error;

pub type Result<T> = std::result::Result<T, EdgeError>;

#[derive(Error, Debug)]
pub enum EdgeError {
    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Model loading error: {0}")]
    ModelLoadError(String),

    #[error("Invalid model '{model}': {reason}")]
    InvalidModel { model: String, reason: String },

    #[error("Arena too small for '{model}': needs {required} bytes, {available} available")]
    ArenaTooSmall {
        model: String,
        required: usize,
        available: usize,
    },

    #[error("Stale tensor handle from '{owner}' (generation {issued}, arena is at {current})")]
    StaleTensor {
        owner: String,
        issued: u64,
        current: u64,
    },

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Processing error: {0}")]
    ProcessingError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TensorFlow Lite error: {0}")]
    TfLite(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
