use crate::TimePeriod;
use core::sync::atomic::{AtomicU64, Ordering};
use kernel_info::config::MICROS_PER_TICK;

/// The system clock in microseconds since boot.
#[derive(Debug, Default)]
pub struct SystemClock {
    micros: AtomicU64,
}

impl SystemClock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            micros: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.micros.load(Ordering::Acquire)
    }

    /// Move the clock forward; wraps on overflow.
    #[inline]
    pub fn advance(&self, micros: u64) {
        self.micros.fetch_add(micros, Ordering::AcqRel);
    }

    /// One timer period.
    #[inline]
    pub fn tick(&self) {
        self.advance(MICROS_PER_TICK);
    }

    /// The current clock plus (or, for absolute periods, combined with) `period`.
    #[inline]
    pub fn expand(&self, period: TimePeriod) -> u64 {
        period.expand(self.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_accumulate() {
        let clock = SystemClock::new();
        clock.tick();
        clock.tick();
        assert_eq!(clock.now(), 2 * MICROS_PER_TICK);
    }

    #[test]
    fn expand_uses_current_sample() {
        let clock = SystemClock::new();
        clock.advance(1_000);
        assert_eq!(clock.expand(TimePeriod::from_micros(500)), 1_500);
        assert_eq!(clock.expand(TimePeriod::ZERO), 1_000);
    }
}
