use core::mem::size_of;
use core::sync::atomic::{AtomicU64, Ordering};

use kernel_alloc::{PAGE_SIZE, Page};
use kernel_intr::DescriptorPointer;

use crate::descriptors::{GDT_ENTRIES, gdt_entries};
use crate::tss::Tss64;

/// One logical processor.
///
/// Lives in a page of its own from enumeration until the machine stops, so
/// the descriptor table and the task-state block it points at have stable
/// addresses.
#[repr(C, align(16))]
#[derive(Debug)]
pub struct Cpu {
    /// Logical id; 0 is the boot processor.
    pub id: usize,
    /// Local APIC id.
    pub apic_id: u8,
    /// Timer interrupts taken on this processor.
    pub ticks: AtomicU64,
    gdt: [u64; GDT_ENTRIES],
    tss: Tss64,
}

const _: () = assert!(size_of::<Cpu>() <= PAGE_SIZE);

impl Cpu {
    /// Move a new record into `page` and point its TSS descriptor at its own
    /// task-state block.
    #[must_use]
    pub fn place(page: Page, id: usize, apic_id: u8) -> &'static Self {
        let cpu = page.leak_as(Self {
            id,
            apic_id,
            ticks: AtomicU64::new(0),
            gdt: [0; GDT_ENTRIES],
            tss: Tss64::new(),
        });
        cpu.gdt = gdt_entries(cpu.tss_base());
        cpu
    }

    #[must_use]
    pub const fn gdt(&self) -> &[u64; GDT_ENTRIES] {
        &self.gdt
    }

    #[must_use]
    pub const fn tss(&self) -> &Tss64 {
        &self.tss
    }

    /// Linear address of this processor's task-state block.
    #[must_use]
    pub fn tss_base(&self) -> u64 {
        (&raw const self.tss).addr() as u64
    }

    /// Operand for `lgdt`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn gdt_pointer(&self) -> DescriptorPointer {
        DescriptorPointer {
            limit: (size_of::<[u64; GDT_ENTRIES]>() - 1) as u16,
            base: self.gdt.as_ptr().addr() as u64,
        }
    }

    /// Count one timer interrupt; returns the new total.
    pub fn tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }
}
