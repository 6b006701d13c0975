use thiserror::Error;

/// Returned by [`IdPool::allocate`](crate::IdPool::allocate) when every id is in use.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("identifier pool exhausted ({capacity} ids in use)")]
pub struct PoolExhausted {
    /// Capacity of the exhausted pool.
    pub capacity: u16,
}
