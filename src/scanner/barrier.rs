//! Counting barrier for outstanding directory tasks.
//!
//! Every unit of work is registered with [`CompletionBarrier::add`] *before*
//! it is handed to another thread, and released with
//! [`CompletionBarrier::done`] when it finishes. [`CompletionBarrier::wait`]
//! blocks until the count returns to zero. Because a task registers its
//! children before it releases itself, the count can only reach zero once
//! the whole tree has been processed.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    pending: Mutex<usize>,
    zero: Condvar,
}

/// Shared counter of outstanding work with a blocking wait-for-zero.
///
/// Cloning is cheap and every clone refers to the same counter.
#[derive(Debug, Clone, Default)]
pub struct CompletionBarrier {
    inner: Arc<Inner>,
}

impl CompletionBarrier {
    /// Create a barrier with no outstanding work.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        // The counter stays consistent even if a holder panicked.
        self.inner
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register `n` units of work. Must happen before they are dispatched.
    pub fn add(&self, n: usize) {
        if n == 0 {
            return;
        }
        *self.lock() += n;
    }

    /// Release one unit of work, waking waiters when the count hits zero.
    pub fn done(&self) {
        let mut pending = self.lock();
        debug_assert!(*pending > 0, "CompletionBarrier::done without matching add");
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.inner.zero.notify_all();
        }
    }

    /// Current number of outstanding units.
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.lock()
    }

    /// Block until every registered unit has been released.
    pub fn wait(&self) {
        let mut pending = self.lock();
        while *pending > 0 {
            pending = self
                .inner
                .zero
                .wait(pending)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    /// Adopt a unit that was already registered with [`add`](Self::add).
    #[must_use]
    pub fn adopt(&self) -> TaskGuard {
        TaskGuard {
            barrier: self.clone(),
        }
    }
}

/// RAII guard releasing one unit of work, also on panic.
#[derive(Debug)]
pub struct TaskGuard {
    barrier: CompletionBarrier,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.barrier.done();
    }
}
