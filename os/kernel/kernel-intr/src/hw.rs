//! # Hardware access seams
//!
//! The interrupt core never executes `in`/`out` or dereferences device memory
//! itself. It talks to the machine through the traits below; the kernel image
//! implements them with inline assembly and volatile accesses, host tests
//! implement them over plain arrays.
//!
//! Constructing a real implementation is the `unsafe` step. Once a value
//! exists, using it is safe.

use core::ptr::NonNull;

/// Byte-wide access to the legacy I/O port space.
pub trait PortIo {
    /// Read one byte from `port`.
    fn inb(&self, port: u16) -> u8;

    /// Write one byte to `port`.
    fn outb(&self, port: u16, value: u8);
}

impl<T: PortIo + ?Sized> PortIo for &T {
    #[inline]
    fn inb(&self, port: u16) -> u8 {
        (**self).inb(port)
    }

    #[inline]
    fn outb(&self, port: u16, value: u8) {
        (**self).outb(port, value);
    }
}

/// 32-bit registers inside one memory-mapped register window.
///
/// Offsets are in bytes from the start of the window.
pub trait Mmio32 {
    fn read32(&self, offset: usize) -> u32;
    fn write32(&self, offset: usize, value: u32);
}

impl<T: Mmio32 + ?Sized> Mmio32 for &T {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }
}

/// Turns the physical address of a register window into something that can
/// access it.
pub trait MmioMapper {
    type Region: Mmio32;

    /// Returns `None` if the window is not reachable.
    fn map(&self, phys: u64) -> Option<Self::Region>;
}

/// A register window accessed with volatile loads and stores.
#[derive(Debug, Clone, Copy)]
pub struct MmioRegion {
    base: NonNull<u8>,
}

// SAFETY: device registers are not tied to a thread; ordering between
// processors is the device's concern.
unsafe impl Send for MmioRegion {}
unsafe impl Sync for MmioRegion {}

impl MmioRegion {
    /// # Safety
    /// `base` must point at a mapped, uncached register window that stays
    /// mapped for the lifetime of the returned value, and every offset used
    /// with it must be 4-byte aligned and inside the window.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u8>) -> Self {
        Self { base }
    }

    #[must_use]
    pub const fn base(&self) -> NonNull<u8> {
        self.base
    }
}

impl Mmio32 for MmioRegion {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: guaranteed by the constructor contract.
        unsafe { self.base.add(offset).cast::<u32>().read_volatile() }
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        // SAFETY: guaranteed by the constructor contract.
        unsafe { self.base.add(offset).cast::<u32>().write_volatile(value) }
    }
}
