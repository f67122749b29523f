//! # Shared Tensor Arena
//!
//! One fixed-size byte region holds the working tensors of whichever model
//! currently owns it. Ownership is taken by a *claim*; each claim bumps the
//! arena generation, so every [`Lease`] and [`TensorHandle`] issued before it
//! stops resolving:
//!
//! ```text
//! claim(kws)   -> generation 1   kws handles valid
//! claim(image) -> generation 2   kws handles now StaleTensor
//! claim(kws)   -> generation 3   fresh kws handles, image handles stale
//! ```
//!
//! Access always goes through [`SharedArena::view`] / [`SharedArena::view_mut`],
//! which check the handle generation against the arena.

use crate::error::{EdgeError, Result};
use crate::models::allocator::MemoryPlan;
use crate::models::tensor::{TensorSpec, TensorView, TensorViewMut};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaId(u64);

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Proof that a model context currently owns the arena
#[derive(Debug, Clone)]
pub struct Lease {
    arena_id: ArenaId,
    generation: u64,
    owner: Arc<str>,
    plan: Arc<MemoryPlan>,
}

impl Lease {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn plan(&self) -> &MemoryPlan {
        &self.plan
    }

    pub fn input(&self, index: usize) -> Result<TensorHandle> {
        let layout = self.plan.inputs.get(index).ok_or_else(|| {
            EdgeError::InvalidInput(format!("'{}' has no input tensor {}", self.owner, index))
        })?;
        Ok(self.handle(layout.offset, &layout.spec))
    }

    pub fn output(&self, index: usize) -> Result<TensorHandle> {
        let layout = self.plan.outputs.get(index).ok_or_else(|| {
            EdgeError::InvalidInput(format!("'{}' has no output tensor {}", self.owner, index))
        })?;
        Ok(self.handle(layout.offset, &layout.spec))
    }

    pub fn input_shape(&self, index: usize) -> Result<Vec<usize>> {
        Ok(self.input(index)?.spec().shape.clone())
    }

    fn handle(&self, offset: usize, spec: &TensorSpec) -> TensorHandle {
        TensorHandle {
            arena_id: self.arena_id,
            generation: self.generation,
            owner: Arc::clone(&self.owner),
            offset,
            spec: spec.clone(),
        }
    }
}

/// Generation-tagged reference to one tensor in the arena
#[derive(Debug, Clone)]
pub struct TensorHandle {
    arena_id: ArenaId,
    generation: u64,
    owner: Arc<str>,
    offset: usize,
    spec: TensorSpec,
}

impl TensorHandle {
    pub fn spec(&self) -> &TensorSpec {
        &self.spec
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn byte_len(&self) -> usize {
        self.spec.byte_len()
    }
}

/// Fixed-capacity scratch region shared by all model contexts
pub struct SharedArena {
    id: ArenaId,
    bytes: Box<[u8]>,
    generation: u64,
    resident: Option<Arc<str>>,
}

impl fmt::Debug for SharedArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedArena")
            .field("id", &self.id)
            .field("capacity", &self.bytes.len())
            .field("generation", &self.generation)
            .field("resident", &self.resident)
            .finish()
    }
}

impl SharedArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            id: ArenaId(NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed)),
            bytes: vec![0u8; capacity].into_boxed_slice(),
            generation: 0,
            resident: None,
        }
    }

    pub fn id(&self) -> ArenaId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Name of the context holding the current claim
    pub fn resident(&self) -> Option<&str> {
        self.resident.as_deref()
    }

    /// Hand the arena to `owner`, revoking whatever claim existed before
    pub fn claim(&mut self, owner: &str, plan: MemoryPlan) -> Result<Lease> {
        if plan.arena_id != self.id {
            return Err(EdgeError::Config(format!(
                "Plan for '{}' was made for arena {}, not {}",
                owner, plan.arena_id, self.id
            )));
        }
        if plan.total_bytes > self.bytes.len() {
            return Err(EdgeError::ArenaTooSmall {
                model: owner.to_string(),
                required: plan.total_bytes,
                available: self.bytes.len(),
            });
        }

        if let Some(previous) = &self.resident {
            if previous.as_ref() != owner {
                log::info!("Arena {}: '{}' displaces '{}'", self.id, owner, previous);
            }
        }

        self.generation += 1;
        self.bytes[..plan.total_bytes].fill(0);
        let owner: Arc<str> = Arc::from(owner);
        self.resident = Some(Arc::clone(&owner));

        log::debug!(
            "Arena {} claimed by '{}' (generation {}, {} bytes)",
            self.id,
            owner,
            self.generation,
            plan.total_bytes
        );

        Ok(Lease {
            arena_id: self.id,
            generation: self.generation,
            owner,
            plan: Arc::new(plan),
        })
    }

    pub fn is_current(&self, lease: &Lease) -> bool {
        lease.arena_id == self.id && lease.generation == self.generation
    }

    /// Fail with [`EdgeError::StaleTensor`] unless `lease` is the live claim
    pub fn verify(&self, lease: &Lease) -> Result<()> {
        self.check(lease.arena_id, lease.generation, &lease.owner)
    }

    pub fn view<'a>(&'a self, handle: &'a TensorHandle) -> Result<TensorView<'a>> {
        self.check(handle.arena_id, handle.generation, &handle.owner)?;
        let range = handle.offset..handle.offset + handle.spec.byte_len();
        Ok(TensorView::new(&handle.spec, &self.bytes[range]))
    }

    pub fn view_mut<'a>(&'a mut self, handle: &'a TensorHandle) -> Result<TensorViewMut<'a>> {
        self.check(handle.arena_id, handle.generation, &handle.owner)?;
        let range = handle.offset..handle.offset + handle.spec.byte_len();
        Ok(TensorViewMut::new(&handle.spec, &mut self.bytes[range]))
    }

    /// Raw arena memory for the backend of the live claim
    pub(crate) fn bytes_for(&mut self, lease: &Lease) -> Result<&mut [u8]> {
        self.verify(lease)?;
        Ok(&mut self.bytes[..])
    }

    /// Raw arena memory regardless of claims; for diagnostics and tests
    pub fn raw_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..]
    }

    fn check(&self, arena_id: ArenaId, generation: u64, owner: &str) -> Result<()> {
        if arena_id != self.id || generation != self.generation {
            return Err(EdgeError::StaleTensor {
                owner: owner.to_string(),
                issued: generation,
                current: self.generation,
            });
        }
        Ok(())
    }
}
