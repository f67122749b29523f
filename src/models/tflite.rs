//! TensorFlow Lite backend
//!
//! The interpreter keeps its own activation memory; the shared arena holds the
//! input and output tensors plus the configured scratch reservation, and data
//! is copied across on every invocation.

use crate::error::{EdgeError, Result};
use crate::models::allocator::MemoryPlan;
use crate::models::backend::{InferenceBackend, ModelRequirements};
use crate::models::tensor::{DataType, TensorSpec};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tflitec::interpreter::{Interpreter, Options};
use tflitec::model::Model;
use tflitec::tensor::{DataType as TfDataType, Tensor};

pub struct TfliteBackend {
    interpreter: Option<Interpreter<'static>>,
    fingerprint: u64,
    thread_count: i32,
    scratch_bytes: usize,
}

impl TfliteBackend {
    pub fn new(thread_count: i32, scratch_bytes: usize) -> Self {
        Self {
            interpreter: None,
            fingerprint: 0,
            thread_count,
            scratch_bytes,
        }
    }

    fn fingerprint(blob: &[u8]) -> u64 {
        let mut hasher = DefaultHasher::new();
        blob.hash(&mut hasher);
        hasher.finish()
    }

    fn build(&self, blob: &[u8]) -> Result<Interpreter<'static>> {
        // Model and interpreter borrow the bytes; leak them for 'static lifetime.
        // `load` only rebuilds when the blob fingerprint changes, so this happens
        // once per distinct model per backend.
        let bytes: &'static [u8] = Box::leak(blob.to_vec().into_boxed_slice());
        let model = Box::leak(Box::new(Model::from_bytes(bytes).map_err(|e| {
            EdgeError::ModelLoadError(format!("Failed to parse TFLite model: {}", e))
        })?));

        let mut options = Options::default();
        options.thread_count = self.thread_count;

        Interpreter::new(model, Some(options)).map_err(|e| {
            EdgeError::ModelLoadError(format!("Failed to create interpreter: {}", e))
        })
    }

    fn spec_of(tensor: &Tensor) -> Result<TensorSpec> {
        let data_type = match tensor.data_type() {
            TfDataType::Int8 => DataType::Int8,
            TfDataType::Uint8 => DataType::UInt8,
            TfDataType::Int16 => DataType::Int16,
            TfDataType::Float32 => DataType::Float32,
            other => {
                return Err(EdgeError::TfLite(format!(
                    "Unsupported tensor type {:?}",
                    other
                )))
            }
        };

        let mut spec = TensorSpec::new(tensor.shape().dimensions().clone(), data_type);
        if let Some(q) = tensor.quantization_parameters() {
            if q.scale != 0.0 {
                spec = spec.quantized(q.scale, q.zero_point);
            }
        }
        Ok(spec)
    }
}

impl InferenceBackend for TfliteBackend {
    fn load(&mut self, blob: &[u8]) -> Result<ModelRequirements> {
        let fingerprint = Self::fingerprint(blob);
        if self.interpreter.is_none() || self.fingerprint != fingerprint {
            log::info!("Building TFLite interpreter ({} bytes)", blob.len());
            self.interpreter = Some(self.build(blob)?);
            self.fingerprint = fingerprint;
        }

        let interpreter = self
            .interpreter
            .as_ref()
            .ok_or_else(|| EdgeError::TfLite("Interpreter missing after build".to_string()))?;

        interpreter
            .allocate_tensors()
            .map_err(|e| EdgeError::TfLite(format!("Failed to allocate tensors: {}", e)))?;

        let mut inputs = Vec::new();
        for i in 0..interpreter.input_tensor_count() {
            let tensor = interpreter
                .input(i)
                .map_err(|e| EdgeError::TfLite(format!("Failed to get input {}: {}", i, e)))?;
            inputs.push(Self::spec_of(&tensor)?);
        }

        let mut outputs = Vec::new();
        for i in 0..interpreter.output_tensor_count() {
            let tensor = interpreter
                .output(i)
                .map_err(|e| EdgeError::TfLite(format!("Failed to get output {}: {}", i, e)))?;
            outputs.push(Self::spec_of(&tensor)?);
        }

        if inputs.is_empty() || outputs.is_empty() {
            return Err(EdgeError::TfLite(
                "Model must have at least one input and one output".to_string(),
            ));
        }

        log::debug!("TFLite inputs: {:?}, outputs: {:?}", inputs, outputs);

        Ok(ModelRequirements {
            inputs,
            outputs,
            scratch_bytes: self.scratch_bytes,
        })
    }

    fn invoke(&mut self, arena: &mut [u8], plan: &MemoryPlan) -> Result<()> {
        let interpreter = self
            .interpreter
            .as_ref()
            .ok_or_else(|| EdgeError::Inference("Model was never loaded".to_string()))?;

        for (i, layout) in plan.inputs.iter().enumerate() {
            interpreter
                .copy(&arena[layout.range()], i)
                .map_err(|e| EdgeError::Inference(format!("Failed to set input {}: {}", i, e)))?;
        }

        interpreter
            .invoke()
            .map_err(|e| EdgeError::Inference(format!("Inference failed: {}", e)))?;

        for (i, layout) in plan.outputs.iter().enumerate() {
            let tensor = interpreter
                .output(i)
                .map_err(|e| EdgeError::Inference(format!("Failed to get output {}: {}", i, e)))?;
            let data = tensor.data::<u8>();
            let target = &mut arena[layout.range()];
            if data.len() != target.len() {
                return Err(EdgeError::Inference(format!(
                    "Output {} has {} bytes, plan expects {}",
                    i,
                    data.len(),
                    target.len()
                )));
            }
            target.copy_from_slice(data);
        }
        Ok(())
    }
}
