//! Seam between the lifecycle manager and the inference engine.

use crate::error::Result;
use crate::models::allocator::MemoryPlan;
use crate::models::tensor::TensorSpec;

/// What a model needs from the arena once its blob has been validated
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequirements {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
    /// Working memory for intermediate activations
    pub scratch_bytes: usize,
}

/// Inference engine driving a single model
///
/// Implementations never hold on to arena memory between calls: `invoke`
/// receives the arena bytes and the plan locating each tensor every time.
pub trait InferenceBackend {
    /// Structurally validate `blob` and report its tensors and scratch needs.
    /// Called on every (re-)initialization of the owning context.
    fn load(&mut self, blob: &[u8]) -> Result<ModelRequirements>;

    /// Run the model over the input tensors laid out by `plan`, writing the
    /// output tensors in place. Blocks until inference completes.
    fn invoke(&mut self, arena: &mut [u8], plan: &MemoryPlan) -> Result<()>;
}
