use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

/// A slot that is written at most once and read freely afterwards.
///
/// Used for the process-wide tables that are built on the boot processor and
/// then published: after [`set`](Self::set) succeeds every processor sees the
/// same `&'static T`.
pub struct SyncOnceCell<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for SyncOnceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncOnceCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Returns the value once it has been published.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.state.load(Ordering::Acquire) == READY {
            // SAFETY: READY is only stored after the value was written.
            Some(unsafe { (*self.value.get()).assume_init_ref() })
        } else {
            None
        }
    }

    /// Publish `value`, or hand it back if the cell was already claimed.
    ///
    /// # Errors
    /// Returns `Err(value)` when another writer got there first.
    pub fn set(&self, value: T) -> Result<&T, T> {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(value);
        }
        Ok(self.publish(value))
    }

    /// Initialize at most once and return the published value.
    ///
    /// Concurrent callers that lose the race spin until the winner is done.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        if let Some(v) = self.get() {
            return v;
        }

        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return self.publish(init());
        }

        while self.state.load(Ordering::Acquire) != READY {
            spin_loop();
        }
        // SAFETY: READY
        unsafe { (*self.value.get()).assume_init_ref() }
    }

    fn publish(&self, value: T) -> &T {
        // SAFETY: the caller won the EMPTY -> WRITING transition, so nobody
        // else touches the slot until READY is stored.
        let v = unsafe { (*self.value.get()).write(value) };
        self.state.store(READY, Ordering::Release);
        v
    }
}

impl<T> Drop for SyncOnceCell<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == READY {
            // SAFETY: READY means the value is initialized, and `&mut self`
            // means no reader is left.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

// SAFETY: shared only after READY; initialization has a single writer.
unsafe impl<T: Sync + Send> Sync for SyncOnceCell<T> {}
unsafe impl<T: Send> Send for SyncOnceCell<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_publishes_once() {
        let cell = SyncOnceCell::new();
        assert!(cell.get().is_none());
        assert_eq!(cell.set(7u32), Ok(&7));
        assert_eq!(cell.set(8u32), Err(8));
        assert_eq!(cell.get(), Some(&7));
    }

    #[test]
    fn get_or_init_runs_initializer_once() {
        let cell = SyncOnceCell::new();
        let mut calls = 0;
        let a = *cell.get_or_init(|| {
            calls += 1;
            1u8
        });
        let b = *cell.get_or_init(|| 2u8);
        assert_eq!((a, b, calls), (1, 1, 1));
    }

    #[test]
    fn drops_published_value() {
        use std::sync::Arc;

        let payload = Arc::new(());
        {
            let cell = SyncOnceCell::new();
            assert!(cell.set(Arc::clone(&payload)).is_ok());
            assert_eq!(Arc::strong_count(&payload), 2);
        }
        assert_eq!(Arc::strong_count(&payload), 1);
    }
}
