//! Synchronisation primitives shared by the CAPI registry core.
//!
//! * [`IdPool`] – lowest-free identifier allocation, never blocks.
//! * [`IdSet`] – fixed-capacity atomic bitset of small ids.
//! * [`LifecycleGuard`] / [`GuardRef`] – counted references with a Retiring flag and a
//!   blocking "wait until unreferenced" used by teardown.
//! * [`SlotTable`] – id-indexed table with cursor-based insertion-order walks.

mod error;
mod guard;
mod id_pool;
pub mod id_set;
mod slot_table;
pub mod wait;

pub use error::PoolExhausted;
pub use guard::{GuardRef, Guarded, LifecycleGuard};
pub use id_pool::IdPool;
pub use id_set::IdSet;
pub use slot_table::{Cursor, SlotTable};
