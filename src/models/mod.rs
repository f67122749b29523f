pub mod allocator;
pub mod backend;
pub mod context;
pub mod tensor;
#[cfg(feature = "tflite")]
pub mod tflite;

// Re-export main types for convenient access
pub use allocator::{ArenaAllocator, MemoryPlan, TensorLayout};
pub use backend::{InferenceBackend, ModelRequirements};
pub use context::{ModelBlob, ModelContext};
pub use tensor::{DataType, Quantization, TensorSpec, TensorView, TensorViewMut};
#[cfg(feature = "tflite")]
pub use tflite::TfliteBackend;

/// Index of rows / cols / channels in a `[batch, rows, cols, channels]` input
pub const INPUT_ROWS_IDX: usize = 1;
pub const INPUT_COLS_IDX: usize = 2;
pub const INPUT_CHANNELS_IDX: usize = 3;
