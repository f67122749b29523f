//! Model lifecycle: one context per pipeline, claiming the shared arena on
//! every (re-)initialization.

use crate::arena::{Lease, SharedArena};
use crate::error::{EdgeError, Result};
use crate::models::allocator::ArenaAllocator;
use crate::models::backend::InferenceBackend;
use std::path::Path;
use std::sync::Arc;

/// Binary model definition, loaded once at startup
#[derive(Clone)]
pub struct ModelBlob {
    bytes: Arc<[u8]>,
}

impl ModelBlob {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            EdgeError::ModelLoadError(format!("Failed to read model {}: {}", path.display(), e))
        })?;
        log::info!("Loaded model blob {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for ModelBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModelBlob({} bytes)", self.bytes.len())
    }
}

/// A model bound to a backend, able to claim the shared arena
///
/// Construction is cheap and does not touch the arena. Every call to
/// [`ModelContext::initialize`] re-validates the blob, re-plans memory and
/// takes the arena, returning a fresh [`Lease`].
pub struct ModelContext {
    name: String,
    blob: ModelBlob,
    backend: Box<dyn InferenceBackend>,
    allocator: Option<ArenaAllocator>,
}

impl ModelContext {
    pub fn new(name: impl Into<String>, blob: ModelBlob, backend: Box<dyn InferenceBackend>) -> Self {
        Self {
            name: name.into(),
            blob,
            backend,
            allocator: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Allocator derived by the last successful initialization
    pub fn allocator(&self) -> Option<&ArenaAllocator> {
        self.allocator.as_ref()
    }

    /// Claim `arena` for this model
    ///
    /// With `allocator_from`, the allocator already derived for another
    /// context is reused; it must have been derived for this same arena.
    pub fn initialize(
        &mut self,
        arena: &mut SharedArena,
        allocator_from: Option<&ArenaAllocator>,
    ) -> Result<Lease> {
        if self.blob.is_empty() {
            return Err(EdgeError::InvalidModel {
                model: self.name.clone(),
                reason: "model blob is empty".to_string(),
            });
        }

        let requirements = self
            .backend
            .load(self.blob.as_bytes())
            .map_err(|e| match e {
                EdgeError::InvalidModel { .. } => e,
                other => EdgeError::InvalidModel {
                    model: self.name.clone(),
                    reason: other.to_string(),
                },
            })?;

        let allocator = match allocator_from {
            Some(shared) if shared.serves(arena) => shared.clone(),
            Some(shared) => {
                return Err(EdgeError::Config(format!(
                    "Allocator for arena {} cannot plan '{}' into arena {}",
                    shared.arena_id(),
                    self.name,
                    arena.id()
                )));
            }
            None => match self.allocator.take() {
                Some(own) if own.serves(arena) => own,
                _ => ArenaAllocator::for_arena(arena),
            },
        };

        let plan = allocator.plan(&self.name, &requirements)?;
        let lease = arena.claim(&self.name, plan)?;
        self.allocator = Some(allocator);

        log::info!(
            "Initialized '{}' on arena {} (generation {})",
            self.name,
            arena.id(),
            lease.generation()
        );
        Ok(lease)
    }

    /// Run inference on the tensors of the live claim
    pub fn infer(&mut self, arena: &mut SharedArena, lease: &Lease) -> Result<()> {
        if lease.owner() != self.name {
            return Err(EdgeError::Inference(format!(
                "'{}' cannot run on a lease held by '{}'",
                self.name,
                lease.owner()
            )));
        }
        let bytes = arena.bytes_for(lease)?;
        self.backend.invoke(bytes, lease.plan())
    }
}
