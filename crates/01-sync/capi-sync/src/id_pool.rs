//! Dense identifier allocator.
//!
//! Devices and applications each draw small integer ids from their own pool.
//! Allocation always hands out the lowest free id and never blocks; an empty
//! pool reports [`PoolExhausted`].

use crate::error::PoolExhausted;
use crate::id_set::IdSet;

/// Fixed-capacity pool of ids in `1..=capacity`.
#[derive(Debug)]
pub struct IdPool {
    in_use: IdSet,
}

impl IdPool {
    /// Creates a pool with every id in `1..=capacity` free.
    pub fn new(capacity: u16) -> Self {
        Self {
            in_use: IdSet::new(capacity),
        }
    }

    /// Number of ids managed by the pool.
    pub fn capacity(&self) -> u16 {
        self.in_use.capacity()
    }

    /// Claims the lowest free id.
    pub fn allocate(&self) -> Result<u16, PoolExhausted> {
        self.in_use.claim_lowest().ok_or(PoolExhausted {
            capacity: self.capacity(),
        })
    }

    /// Returns `id` to the pool.
    ///
    /// Releasing an id that is not allocated is a caller bug; it is ignored in
    /// release builds.
    pub fn release(&self, id: u16) {
        let was_allocated = self.in_use.remove(id);
        debug_assert!(was_allocated, "released id {id} that was not allocated");
    }

    /// Returns `true` if `id` is currently allocated.
    pub fn is_allocated(&self, id: u16) -> bool {
        self.in_use.contains(id)
    }

    /// Number of ids currently allocated.
    pub fn allocated(&self) -> usize {
        self.in_use.len()
    }
}
