//! Synchronization primitives shared by the command layer and the aggregator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// A counting semaphore bounding how many tasks run at once.
///
/// The aggregator holds one sized to `max-concurrent`; the command layer holds a
/// crate-wide one that caps concurrent child processes. Permits are returned by
/// dropping the [`SemaphoreGuard`].
#[derive(Clone)]
pub struct Semaphore {
    state: Arc<(Mutex<usize>, Condvar)>,
    permits: usize,
}

/// Releases its permit on drop, including during unwinding.
pub struct SemaphoreGuard {
    state: Arc<(Mutex<usize>, Condvar)>,
}

impl Semaphore {
    /// Create a semaphore with `permits` slots. Zero is bumped to one so that
    /// callers can never deadlock on a misconfigured bound.
    pub fn new(permits: usize) -> Self {
        let permits = permits.max(1);
        Self {
            state: Arc::new((Mutex::new(permits), Condvar::new())),
            permits,
        }
    }

    /// Total number of permits this semaphore was created with.
    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Block until a permit is free and take it.
    pub fn acquire(&self) -> SemaphoreGuard {
        let (lock, cvar) = &*self.state;
        let mut available = lock.lock().unwrap_or_else(PoisonError::into_inner);
        while *available == 0 {
            available = cvar
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;

        SemaphoreGuard {
            state: Arc::clone(&self.state),
        }
    }
}

impl Drop for SemaphoreGuard {
    fn drop(&mut self) {
        let (lock, cvar) = &*self.state;
        let mut available = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *available += 1;
        cvar.notify_one();
    }
}

/// Cooperative cancellation flag for a refresh.
///
/// Cloning shares the flag. Work already handed to git runs to completion (or
/// its timeout); tasks observe the flag between steps.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
