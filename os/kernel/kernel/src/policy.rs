//! What the kernel does with the interrupts the core does not handle itself.

use core::sync::atomic::{AtomicU64, Ordering};

use bitfield_struct::bitfield;
use kernel_cpu::Cpu;
use kernel_info::config::MAX_CPUS;
use kernel_intr::{IRQ_BASE_VECTOR, InterruptContext, InterruptPolicy, InterruptVector};
use kernel_sync::SpinLock;
use kernel_time::SystemClock;
use log::{trace, warn};

use crate::arch::{clear_task_switched, halt_forever, read_cr2};
use crate::panic::is_halting;

const IRQ_LINES: usize = 256 - IRQ_BASE_VECTOR as usize;

/// Page-fault error code pushed by the CPU.
#[bitfield(u64)]
pub struct PageFaultError {
    /// Clear for a non-present page, set for a protection violation.
    pub present: bool,
    pub write: bool,
    pub user: bool,
    pub reserved_bit: bool,
    pub instruction_fetch: bool,
    pub protection_key: bool,
    pub shadow_stack: bool,
    #[bits(57)]
    __: u64,
}

/// A user-mode exception waiting for a thread model to deliver it to.
#[derive(Debug, Clone, Copy)]
pub struct PendingException {
    pub vector: InterruptVector,
    pub rip: u64,
    pub error_code: u64,
    /// CR2, for page faults.
    pub address: Option<u64>,
}

pub struct KernelPolicy {
    clock: SystemClock,
    pending: [SpinLock<Option<PendingException>>; MAX_CPUS],
    irqs: [AtomicU64; IRQ_LINES],
    current: fn() -> Option<&'static Cpu>,
    by_apic_id: fn(u8) -> Option<&'static Cpu>,
}

impl KernelPolicy {
    /// `current` and `by_apic_id` resolve processor records once they exist.
    pub const fn new(
        current: fn() -> Option<&'static Cpu>,
        by_apic_id: fn(u8) -> Option<&'static Cpu>,
    ) -> Self {
        Self {
            clock: SystemClock::new(),
            pending: [const { SpinLock::new(None) }; MAX_CPUS],
            irqs: [const { AtomicU64::new(0) }; IRQ_LINES],
            current,
            by_apic_id,
        }
    }

    pub const fn clock(&self) -> &SystemClock {
        &self.clock
    }

    fn record(&self, exception: PendingException) {
        let Some(cpu) = (self.current)() else {
            warn!("{exception:?} before processor records exist");
            return;
        };

        warn!(
            "CPU {}: user {} at {:#x} (error {:#x}, address {:x?})",
            cpu.id,
            exception.vector.diagnostic(),
            exception.rip,
            exception.error_code,
            exception.address
        );

        let previous = self.pending[cpu.id].lock().replace(exception);
        if let Some(previous) = previous {
            warn!("CPU {}: dropped undelivered {previous:?}", cpu.id);
        }
    }
}

impl InterruptPolicy for KernelPolicy {
    fn user_exception(&self, vector: InterruptVector, ctx: &InterruptContext) {
        self.record(PendingException {
            vector,
            rip: ctx.rip,
            error_code: ctx.error_code,
            address: None,
        });
    }

    fn page_fault(&self, ctx: &InterruptContext) {
        let address = read_cr2();
        let error = PageFaultError::from_bits(ctx.error_code);
        trace!("Page fault at {address:#x}: {error:?}");

        self.record(PendingException {
            vector: InterruptVector::PageFault,
            rip: ctx.rip,
            error_code: ctx.error_code,
            address: Some(address),
        });
    }

    fn device_not_available(&self, _ctx: &InterruptContext) {
        clear_task_switched();
    }

    fn timer_tick(&self, apic_id: u8) {
        if is_halting() {
            halt_forever();
        }

        let Some(cpu) = (self.by_apic_id)(apic_id) else {
            return;
        };
        cpu.tick();
        if cpu.id == 0 {
            self.clock.tick();
        }
    }

    fn irq(&self, line: u8) {
        if let Some(count) = self.irqs.get(usize::from(line)) {
            count.fetch_add(1, Ordering::Relaxed);
        }
        trace!("IRQ {line}");
    }
}
