//! Memory planning for models sharing one arena.

use crate::arena::{ArenaId, SharedArena};
use crate::error::{EdgeError, Result};
use crate::models::backend::ModelRequirements;
use crate::models::tensor::TensorSpec;
use std::ops::Range;

/// Byte alignment of every planned region
pub const ARENA_ALIGNMENT: usize = 16;

/// Location of one tensor inside the arena
#[derive(Debug, Clone, PartialEq)]
pub struct TensorLayout {
    pub offset: usize,
    pub spec: TensorSpec,
}

impl TensorLayout {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.spec.byte_len()
    }
}

/// Memory layout of one model inside one arena
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPlan {
    pub arena_id: ArenaId,
    pub inputs: Vec<TensorLayout>,
    pub outputs: Vec<TensorLayout>,
    pub scratch: Range<usize>,
    /// Bytes of the arena claimed by this plan (from offset 0)
    pub total_bytes: usize,
}

/// Linear planner derived once for a specific arena
///
/// A second context on the same arena can reuse the allocator derived for
/// the first one instead of deriving its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaAllocator {
    arena_id: ArenaId,
    capacity: usize,
    alignment: usize,
}

fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

impl ArenaAllocator {
    pub fn for_arena(arena: &SharedArena) -> Self {
        log::debug!(
            "Deriving allocator for arena {} ({} bytes)",
            arena.id(),
            arena.capacity()
        );
        Self {
            arena_id: arena.id(),
            capacity: arena.capacity(),
            alignment: ARENA_ALIGNMENT,
        }
    }

    pub fn arena_id(&self) -> ArenaId {
        self.arena_id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether this allocator was derived for `arena`
    pub fn serves(&self, arena: &SharedArena) -> bool {
        self.arena_id == arena.id() && self.capacity == arena.capacity()
    }

    /// Lay out inputs, outputs and scratch for `model`
    pub fn plan(&self, model: &str, requirements: &ModelRequirements) -> Result<MemoryPlan> {
        let mut cursor = 0usize;
        let mut place = |spec: &TensorSpec| {
            let offset = align_up(cursor, self.alignment);
            cursor = offset + spec.byte_len();
            TensorLayout {
                offset,
                spec: spec.clone(),
            }
        };

        let inputs: Vec<TensorLayout> = requirements.inputs.iter().map(&mut place).collect();
        let outputs: Vec<TensorLayout> = requirements.outputs.iter().map(&mut place).collect();

        let scratch_start = align_up(cursor, self.alignment);
        let scratch = scratch_start..scratch_start + requirements.scratch_bytes;
        let total_bytes = scratch.end;

        if total_bytes > self.capacity {
            return Err(EdgeError::ArenaTooSmall {
                model: model.to_string(),
                required: total_bytes,
                available: self.capacity,
            });
        }

        log::debug!(
            "Planned '{}': {} inputs, {} outputs, {} scratch bytes, {} of {} bytes used",
            model,
            inputs.len(),
            outputs.len(),
            requirements.scratch_bytes,
            total_bytes,
            self.capacity
        );

        Ok(MemoryPlan {
            arena_id: self.arena_id,
            inputs,
            outputs,
            scratch,
            total_bytes,
        })
    }
}
