pub mod arena;
pub mod audio;
pub mod camera;
pub mod config;
pub mod detection;
pub mod display;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod platform;
pub mod processing;
pub mod profiler;

pub use arena::{Lease, SharedArena, TensorHandle};
pub use config::UseCaseConfig;
pub use error::{EdgeError, Result};
pub use pipeline::{Orchestrator, PipelineState, StepOutcome};
