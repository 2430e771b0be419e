//! Fatal error path: report, then stop every processor.

use core::panic::PanicInfo;
use core::sync::atomic::{AtomicBool, Ordering};

use kernel_qemu::qemu_trace;

use crate::arch::halt_forever;

/// Set once any processor panicked. The others halt the next time they look.
static HALTING: AtomicBool = AtomicBool::new(false);

pub fn is_halting() -> bool {
    HALTING.load(Ordering::Acquire)
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    qemu_trace!("Kernel Panic: {}\n", info.message());
    if let Some(location) = info.location() {
        qemu_trace!("    at {location}\n");
    }
    HALTING.store(true, Ordering::Release);
    halt_forever()
}
