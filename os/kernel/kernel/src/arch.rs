//! Privileged instructions the core crates leave to the kernel image.

use core::arch::asm;

use kernel_cpu::{CpuArch, KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR, TSS_SELECTOR};
use kernel_intr::DescriptorPointer;

/// Table loads on the executing processor.
#[derive(Debug, Clone, Copy)]
pub struct X86Arch;

impl CpuArch for X86Arch {
    fn load_tables(&self, gdt: DescriptorPointer, idt: DescriptorPointer) {
        // SAFETY: both tables are 'static and fully built before bring-up
        // hands them out; interrupts are still disabled here.
        unsafe {
            asm!(
                "lgdt [{}]",
                in(reg) &raw const gdt,
                options(readonly, nostack, preserves_flags)
            );

            // Far reload of CS through a far return.
            asm!(
                "push {cs}",
                "lea rax, [rip + 2f]",
                "push rax",
                "retfq",
                "2:",
                cs = in(reg) u64::from(KERNEL_CODE_SELECTOR),
                out("rax") _,
                options(preserves_flags)
            );

            asm!(
                "mov ds, {0:x}",
                "mov es, {0:x}",
                "mov ss, {0:x}",
                in(reg) KERNEL_DATA_SELECTOR,
                options(nostack, preserves_flags)
            );

            asm!(
                "ltr {0:x}",
                in(reg) TSS_SELECTOR,
                options(nostack, preserves_flags)
            );

            asm!(
                "lidt [{}]",
                in(reg) &raw const idt,
                options(readonly, nostack, preserves_flags)
            );
        }
    }
}

/// Faulting linear address of the last page fault.
#[inline]
pub fn read_cr2() -> u64 {
    let cr2: u64;
    // SAFETY: reading CR2 has no side effects.
    unsafe {
        asm!("mov {}, cr2", out(reg) cr2, options(nomem, nostack, preserves_flags));
    }
    cr2
}

#[inline]
pub fn read_cr3() -> u64 {
    let cr3: u64;
    // SAFETY: reading CR3 has no side effects.
    unsafe {
        asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
    }
    cr3
}

/// Clear CR0.TS so FPU instructions stop raising `#NM`.
#[inline]
pub fn clear_task_switched() {
    // SAFETY: only affects lazy FPU switching, which nothing uses yet.
    unsafe {
        asm!("clts", options(nomem, nostack, preserves_flags));
    }
}

/// Enable interrupts and sleep until the next one.
#[inline]
pub fn wait_for_interrupt() {
    // SAFETY: `sti; hlt` back to back cannot lose a wakeup.
    unsafe {
        asm!("sti", "hlt", options(nomem, nostack));
    }
}

/// Stop this processor for good.
pub fn halt_forever() -> ! {
    loop {
        // SAFETY: with interrupts off only an NMI wakes us, and we halt again.
        unsafe {
            asm!("cli", "hlt", options(nomem, nostack));
        }
    }
}
