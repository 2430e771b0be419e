use core::{
    hint::spin_loop,
    sync::atomic::{AtomicU32, Ordering},
};

/// Counts participants that have reached a rendezvous point.
///
/// Arrivals are a single atomic fetch-and-add and never take a lock, so the
/// counter can be bumped from contexts that must not contend with anything
/// else (e.g. a processor finishing its own bring-up).
#[derive(Debug)]
pub struct ArrivalCounter {
    arrived: AtomicU32,
}

impl Default for ArrivalCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrivalCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            arrived: AtomicU32::new(0),
        }
    }

    /// Check in; returns the number of arrivals including this one.
    #[inline]
    pub fn arrive(&self) -> u32 {
        self.arrived.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[inline]
    pub fn arrived(&self) -> u32 {
        self.arrived.load(Ordering::Acquire)
    }

    /// Spin until at least `expected` participants have arrived.
    ///
    /// There is no timeout: a participant that never arrives stalls the
    /// caller forever.
    pub fn wait_for(&self, expected: u32) {
        while self.arrived() < expected {
            spin_loop();
        }
    }
}
