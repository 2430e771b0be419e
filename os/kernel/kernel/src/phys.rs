//! Physical memory through the kernel's window.

use core::ptr::NonNull;

use kernel_acpi::PhysMapRo;
use kernel_alloc::PhysWindow;
use kernel_info::memory::PHYS_WINDOW_SIZE;
use kernel_intr::hw::{MmioMapper, MmioRegion};

/// Read-only view of firmware tables.
#[derive(Debug, Clone, Copy)]
pub struct FirmwareMap(PhysWindow);

impl FirmwareMap {
    pub const fn new(window: PhysWindow) -> Self {
        Self(window)
    }
}

impl PhysMapRo for FirmwareMap {
    unsafe fn map_ro<'a>(&self, paddr: u64, len: usize) -> &'a [u8] {
        let Some(ptr) = self.0.ptr::<u8>(paddr) else {
            return &[];
        };

        // Clip at the end of the window.
        let available = usize::try_from(PHYS_WINDOW_SIZE - paddr).unwrap_or(usize::MAX);
        // SAFETY: the whole window is mapped readable for the kernel's lifetime.
        unsafe { core::slice::from_raw_parts(ptr.cast_const(), len.min(available)) }
    }
}

/// Device register windows, reached through the physical window.
#[derive(Debug, Clone, Copy)]
pub struct DeviceMap(PhysWindow);

impl DeviceMap {
    /// # Safety
    /// The window must map device memory uncached, and every register window
    /// this is asked for must stay mapped for the lifetime of the kernel.
    pub const unsafe fn new(window: PhysWindow) -> Self {
        Self(window)
    }
}

impl MmioMapper for DeviceMap {
    type Region = MmioRegion;

    fn map(&self, phys: u64) -> Option<MmioRegion> {
        let base = NonNull::new(self.0.ptr::<u8>(phys)?)?;
        // SAFETY: see `DeviceMap::new`.
        Some(unsafe { MmioRegion::new(base) })
    }
}
