//! Counted lifecycle guard with a blocking quiescence wait.
//!
//! A guard packs a reference count and a Retiring flag into one `AtomicU32`.
//! The owner starts with one reference. Users that must not block take extra
//! references with [`LifecycleGuard::try_acquire`], which fails once the owner
//! has retired the record. Teardown retires, drops the owner's reference and
//! parks in [`LifecycleGuard::wait_until_unreferenced`] until every outstanding
//! reference has been released.
//!
//! [`GuardRef`] ties one counted reference to an `Arc` so that reference
//! bookkeeping follows ownership: cloning acquires, dropping releases.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::wait;

const RETIRING: u32 = 1 << 31;
const COUNT_MASK: u32 = RETIRING - 1;

/// Reference count plus Retiring flag for a shared record.
pub struct LifecycleGuard {
    state: AtomicU32,
}

impl LifecycleGuard {
    /// Creates an active guard holding the owner's single reference.
    pub fn new() -> Self {
        Self {
            state: AtomicU32::new(1),
        }
    }

    /// Takes a reference unless the guard is retiring or already drained.
    ///
    /// Never blocks.
    pub fn try_acquire(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & RETIRING != 0 || current & COUNT_MASK == 0 {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Takes an additional reference on behalf of a caller that already holds one.
    pub fn acquire(&self) {
        let prev = self.state.fetch_add(1, Ordering::Relaxed);
        debug_assert!(
            prev & COUNT_MASK != 0,
            "acquire on a guard without live references"
        );
        debug_assert!(prev & COUNT_MASK < COUNT_MASK - 1, "guard count overflow");
    }

    /// Drops one reference; returns `true` if it was the last one.
    pub fn release(&self) -> bool {
        let prev = self.state.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev & COUNT_MASK != 0, "release on a drained guard");
        if prev & COUNT_MASK == 1 {
            wait::wake_all(&self.state);
            true
        } else {
            false
        }
    }

    /// Marks the guard as retiring; returns `true` on the first call.
    pub fn retire(&self) -> bool {
        self.state.fetch_or(RETIRING, Ordering::AcqRel) & RETIRING == 0
    }

    /// Returns `true` once [`retire`](Self::retire) has been called.
    pub fn is_retiring(&self) -> bool {
        self.state.load(Ordering::Acquire) & RETIRING != 0
    }

    /// Current number of live references.
    pub fn refs(&self) -> u32 {
        self.state.load(Ordering::Acquire) & COUNT_MASK
    }

    /// Blocks until the reference count reaches zero.
    pub fn wait_until_unreferenced(&self) {
        loop {
            let current = self.state.load(Ordering::Acquire);
            if current & COUNT_MASK == 0 {
                return;
            }
            wait::wait_u32(&self.state, current);
        }
    }
}

impl Default for LifecycleGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifecycleGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleGuard")
            .field("refs", &self.refs())
            .field("retiring", &self.is_retiring())
            .finish()
    }
}

/// Records whose lifetime is tracked by an embedded [`LifecycleGuard`].
pub trait Guarded {
    /// Returns the record's guard.
    fn lifecycle(&self) -> &LifecycleGuard;
}

/// One counted reference to a guarded record.
pub struct GuardRef<T: Guarded> {
    target: Arc<T>,
}

impl<T: Guarded> GuardRef<T> {
    /// Wraps the owner's initial reference of a freshly created record.
    ///
    /// Must be called at most once per record, before any other reference is taken.
    pub fn adopt(target: Arc<T>) -> Self {
        debug_assert_eq!(target.lifecycle().refs(), 1, "adopt expects a fresh guard");
        Self { target }
    }

    /// Takes a new reference unless the record is retiring.
    pub fn try_acquire(target: &Arc<T>) -> Option<Self> {
        target.lifecycle().try_acquire().then(|| Self {
            target: Arc::clone(target),
        })
    }

    /// The shared record behind this reference.
    pub fn target(&self) -> &Arc<T> {
        &self.target
    }
}

impl<T: Guarded> Clone for GuardRef<T> {
    fn clone(&self) -> Self {
        self.target.lifecycle().acquire();
        Self {
            target: Arc::clone(&self.target),
        }
    }
}

impl<T: Guarded> Deref for GuardRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.target
    }
}

impl<T: Guarded> Drop for GuardRef<T> {
    fn drop(&mut self) {
        self.target.lifecycle().release();
    }
}

impl<T: Guarded + fmt::Debug> fmt::Debug for GuardRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GuardRef").field(&self.target).finish()
    }
}
