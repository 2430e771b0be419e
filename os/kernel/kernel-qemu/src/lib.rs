//! # QEMU debug console
//!
//! Output for kernels running under QEMU with `-debugcon`: every byte written
//! to I/O port `0x402` shows up on the host.
//!
//! ```text
//! log::info!(..) ──► QemuLogger ──┐
//!                                 ├──► QemuSink ──► out 0x402 ──► host
//! qemu_trace!(..) ────────────────┘
//! ```
//!
//! * [`QemuLogger`] is the `log` backend. Records come out as
//!   `[LEVEL] target: message`.
//! * [`qemu_trace!`] writes directly, without the logger. It stays usable in
//!   a panic handler, before the logger is installed, and with interrupts off.
//!
//! With the `enabled` feature off both compile to nothing. Off the bare-metal
//! target (host tests) the sink discards its input.
//!
//! ```bash
//! qemu-system-x86_64 ... -debugcon stdio
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::QemuLogger;

#[cfg(feature = "enabled")]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    #[cfg(all(target_arch = "x86_64", target_os = "none"))]
    #[allow(clippy::inline_always)]
    #[inline(always)]
    pub fn dbg_putc(c: u8) {
        const QEMU_DEBUG_PORT: u16 = 0x402;

        // SAFETY: port 0x402 is QEMU's debug console; on real hardware the
        // write goes nowhere.
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") QEMU_DEBUG_PORT,
                in("al") c,
                options(nomem, nostack, preserves_flags)
            );
        }
    }

    #[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
    #[inline]
    pub const fn dbg_putc(_c: u8) {}

    /// Unbuffered writer onto the debug port.
    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            s.bytes().for_each(dbg_putc);
            Ok(())
        }
    }

    #[inline]
    pub fn qemu_write(args: fmt::Arguments) {
        // Best effort; the sink itself never fails.
        let _ = QemuSink.write_fmt(args);
    }
}

#[cfg(not(feature = "enabled"))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt;

    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub const fn qemu_write(_: fmt::Arguments) {}
}

/// `print!`-style output straight to the debug console.
#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
