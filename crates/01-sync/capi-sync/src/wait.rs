//! Futex-style wait/notify shims used by the lifecycle guard.
//!
//! Teardown paths park on the guard's packed state word until the reference
//! count drains. Native targets rely on the `atomic-wait` crate, which maps to
//! `futex` on Linux and the equivalent primitive elsewhere.

use std::sync::atomic::{AtomicU32, Ordering};

/// Result of attempting to wait on an atomic location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// The caller parked and returned after a wake (possibly spurious).
    Woken,
    /// The value no longer matched when the wait was attempted.
    NotEqual,
}

/// Blocks the current thread while `atomic` still holds `expected`.
///
/// Spurious wakeups are possible; callers re-check their condition in a loop.
#[inline]
pub fn wait_u32(atomic: &AtomicU32, expected: u32) -> WaitResult {
    if atomic.load(Ordering::Acquire) != expected {
        return WaitResult::NotEqual;
    }
    atomic_wait::wait(atomic, expected);
    WaitResult::Woken
}

/// Wakes all waiters parked on `atomic`.
#[inline]
pub fn wake_all(atomic: &AtomicU32) {
    atomic_wait::wake_all(atomic as *const AtomicU32);
}
