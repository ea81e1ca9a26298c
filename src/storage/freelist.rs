//! Local id allocation with a free list.
//!
//! Ids start at 1. Released ids are handed out again before fresh ones, in
//! no particular order.

use serde::{Deserialize, Serialize};

use crate::types::{GraphError, LocalId, Result};

/// Free-list allocator for one id space of a partial graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u32,
    free: Vec<u32>,
    #[serde(default)]
    limit: Option<u32>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Allocator over the full 32-bit local id space.
    pub fn new() -> Self {
        Self {
            next: 1,
            free: Vec::new(),
            limit: None,
        }
    }

    /// Allocator handing out at most ids `1..=limit`.
    pub fn bounded(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Allocator whose first fresh id is `first`; lower ids stay reserved.
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: first.max(1),
            ..Self::new()
        }
    }

    /// Hands out a free id.
    pub fn allocate(&mut self) -> Result<LocalId> {
        if let Some(id) = self.free.pop() {
            return Ok(LocalId(id));
        }
        let exhausted = match self.limit {
            Some(limit) => self.next > limit,
            None => self.next == u32::MAX,
        };
        if exhausted {
            return Err(GraphError::Capacity("id space exhausted"));
        }
        let id = self.next;
        self.next += 1;
        Ok(LocalId(id))
    }

    /// Takes a specific id out of circulation.
    ///
    /// Ids above the high-water mark are accepted and the ids skipped over
    /// are never handed out.
    pub fn claim(&mut self, id: LocalId) -> Result<()> {
        if id.0 == 0 {
            return Err(GraphError::IdSpace("id 0 is reserved"));
        }
        if self.limit.is_some_and(|limit| id.0 > limit) {
            return Err(GraphError::Capacity("id beyond pool limit"));
        }
        if id.0 >= self.next {
            if id.0 == u32::MAX {
                return Err(GraphError::IdSpace("id beyond local id space"));
            }
            self.next = id.0 + 1;
            return Ok(());
        }
        match self.free.iter().position(|&free| free == id.0) {
            Some(pos) => {
                self.free.swap_remove(pos);
                Ok(())
            }
            None => Err(GraphError::IdSpace("id already in use")),
        }
    }

    /// Returns an id to the free list.
    pub fn release(&mut self, id: LocalId) {
        debug_assert!(id.0 != 0 && id.0 < self.next, "released id was never allocated");
        debug_assert!(!self.free.contains(&id.0), "double release of {}", id.0);
        self.free.push(id.0);
    }

    /// Number of ids currently handed out.
    pub fn in_use(&self) -> usize {
        (self.next as usize - 1) - self.free.len()
    }

    /// Highest id ever handed out, 0 if none.
    pub fn high_water(&self) -> u32 {
        self.next - 1
    }
}
