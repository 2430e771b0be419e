//! # x86 I/O Port Access
//!
//! The legacy 16-bit port space, reached with `in`/`out`. The core crates only
//! need byte access (PIC masks, PIT channel 2, the speaker gate at 0x61), so
//! that is all [`X86Ports`] provides.
//!
//! ```text
//! 0x0020-0x0021   PIC #1
//! 0x0040-0x0043   PIT
//! 0x0061          PIT channel 2 gate / speaker
//! 0x00A0-0x00A1   PIC #2
//! 0x0402          QEMU debug console
//! ```

use kernel_intr::hw::PortIo;

/// Write one byte to an I/O port.
///
/// # Safety
/// Must run at CPL 0, and `port` must belong to a device that is in a state
/// where writing `val` is meaningful. Writing the wrong port can wedge the
/// machine. `out` is not a memory fence.
#[inline]
pub unsafe fn outb(port: u16, val: u8) {
    unsafe {
        core::arch::asm!("out dx, al", in("dx") port, in("al") val, options(nomem, nostack, preserves_flags));
    }
}

/// Read one byte from an I/O port.
///
/// # Safety
/// Must run at CPL 0, and `port` must be a readable register of a present
/// device. `in` is not a memory fence.
#[inline]
pub unsafe fn inb(port: u16) -> u8 {
    let mut v: u8;
    unsafe {
        core::arch::asm!("in al, dx", in("dx") port, out("al") v, options(nomem, nostack, preserves_flags));
    }
    v
}

/// The machine's port space as a [`PortIo`].
#[derive(Debug, Clone, Copy)]
pub struct X86Ports(());

impl X86Ports {
    /// # Safety
    /// Only ring-0 kernel code may hold one, and whoever does is responsible
    /// for not racing other users of the same device.
    pub const unsafe fn new() -> Self {
        Self(())
    }
}

impl PortIo for X86Ports {
    #[inline]
    fn inb(&self, port: u16) -> u8 {
        // SAFETY: constructing `X86Ports` asserted ring 0.
        unsafe { inb(port) }
    }

    #[inline]
    fn outb(&self, port: u16, value: u8) {
        // SAFETY: constructing `X86Ports` asserted ring 0.
        unsafe { outb(port, value) }
    }
}
