//! # Interrupt dispatch
//!
//! The single function the entry stubs call. Every vector in the table maps to
//! exactly one [`VectorClass`]; anything else means the table is corrupt.
//!
//! | class               | kernel mode            | user mode                |
//! |---------------------|------------------------|--------------------------|
//! | always fatal        | halt                   | halt                     |
//! | user exception      | halt                   | `user_exception`         |
//! | page fault          | halt ("Page Fault")    | `page_fault`             |
//! | device not avail.   | `device_not_available` | `device_not_available`   |
//! | spurious            | return, no EOI         | return, no EOI           |
//! | timer               | `timer_tick`, EOI      | `timer_tick`, EOI        |
//! | IRQ                 | `irq(line)`, EOI       | `irq(line)`, EOI         |

use log::warn;

use crate::context::InterruptContext;
use crate::hw::Mmio32;
use crate::lapic::LocalApic;
use crate::vectors::{IRQ_BASE_VECTOR, InterruptVector, VectorClass};

/// Kernel behaviour behind the non-fatal vectors.
pub trait InterruptPolicy {
    /// A CPU exception raised by user code.
    fn user_exception(&self, vector: InterruptVector, ctx: &InterruptContext);

    /// A page fault raised by user code.
    fn page_fault(&self, ctx: &InterruptContext);

    /// `#NM`: an FPU instruction ran with CR0.TS set.
    fn device_not_available(&self, ctx: &InterruptContext);

    /// The local timer fired on the processor with this APIC ID.
    fn timer_tick(&self, apic_id: u8);

    /// Routing-chip line `line` is in service.
    fn irq(&self, line: u8);
}

/// Dispatch one interrupt.
///
/// # Panics
/// With the vector's diagnostic for fatal exceptions, and with
/// `"Invalid interrupt number"` for a vector the table never installs.
pub fn handle<R: Mmio32>(
    ctx: &InterruptContext,
    lapic: &LocalApic<R>,
    policy: &impl InterruptPolicy,
) {
    let Some(vector) = InterruptVector::from_number(ctx.vector) else {
        panic!("Invalid interrupt number");
    };

    match vector.class() {
        VectorClass::AlwaysFatal => panic!("{}", vector.diagnostic()),
        VectorClass::UserException => {
            if ctx.is_kernel_mode() {
                panic!("{}", vector.diagnostic());
            }
            policy.user_exception(vector, ctx);
        }
        VectorClass::PageFault => {
            if ctx.is_kernel_mode() {
                panic!("{}", vector.diagnostic());
            }
            policy.page_fault(ctx);
        }
        VectorClass::DeviceNotAvailable => policy.device_not_available(ctx),
        VectorClass::Spurious => {}
        VectorClass::Timer => {
            policy.timer_tick(lapic.id());
            lapic.eoi();
        }
        VectorClass::Irq => {
            match lapic.highest_in_service() {
                Some(v) if v >= IRQ_BASE_VECTOR => policy.irq(v - IRQ_BASE_VECTOR),
                in_service => warn!("Spurious IRQ entry (in service: {in_service:?})"),
            }
            lapic.eoi();
        }
    }
}
