//! # Physical memory window
//!
//! The kernel sees the first 4 GiB of physical memory through a fixed linear
//! window: physical address `pa` is readable and writable at `base + pa`.
//! Everything that has to touch memory by physical address (firmware tables,
//! controller registers, the trampoline page) goes through here.

use kernel_info::memory::{PHYS_WINDOW_BASE, PHYS_WINDOW_SIZE};

/// Linear physical-to-virtual translation for the low 4 GiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysWindow {
    base: u64,
}

impl PhysWindow {
    /// The window the kernel runs with.
    pub const KERNEL: Self = Self::new(PHYS_WINDOW_BASE);

    /// A window whose physical address 0 lives at virtual `base`.
    #[must_use]
    pub const fn new(base: u64) -> Self {
        Self { base }
    }

    #[must_use]
    pub const fn base(self) -> u64 {
        self.base
    }

    /// Virtual address of `pa`, or `None` past the end of the window.
    #[must_use]
    pub const fn to_virt(self, pa: u64) -> Option<u64> {
        if pa < PHYS_WINDOW_SIZE {
            Some(self.base + pa)
        } else {
            None
        }
    }

    /// Inverse of [`to_virt`](Self::to_virt).
    #[must_use]
    pub const fn to_phys(self, va: u64) -> Option<u64> {
        if va >= self.base && va - self.base < PHYS_WINDOW_SIZE {
            Some(va - self.base)
        } else {
            None
        }
    }

    /// Typed pointer to `pa` inside the window.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn ptr<T>(self, pa: u64) -> Option<*mut T> {
        self.to_virt(pa).map(|va| va as usize as *mut T)
    }
}
