//! # Secondary processor trampoline
//!
//! A start-up IPI drops the target processor into 16-bit real mode at
//! `vector << 12`. The code below is assembled for
//! [`AP_LAUNCH_PHYS`], copied there by the boot processor, and walks the
//! processor up to long mode:
//!
//! ```text
//! real mode ──lgdt, CR0.PE──► protected mode ──PAE, CR3, EFER.LME, CR0.PG──►
//! long mode ──ticket──► own stack ──► ap_entry
//! ```
//!
//! The data block at the end is patched per boot:
//!
//! | field        | value                                   |
//! |--------------|-----------------------------------------|
//! | `cr3`        | the boot processor's page tables        |
//! | `stacks`     | base of [`AP_STACKS`]                   |
//! | `stack_size` | [`KERNEL_STACK_SIZE`]                   |
//! | `entry`      | [`ap_entry`](crate::boot::ap_entry)     |
//! | `ticket`     | 0, incremented by each arriving AP      |
//!
//! The page tables must identity-map the launch page and live below 4 GiB.

use core::arch::global_asm;
use core::sync::atomic::{Ordering, fence};

use kernel_alloc::{PAGE_SIZE, PhysWindow};
use kernel_cpu::Trampoline;
use kernel_info::config::MAX_CPUS;
use kernel_info::memory::{AP_LAUNCH_PHYS, KERNEL_STACK_SIZE};

use crate::arch::read_cr3;

#[repr(C, align(16))]
struct KernelStack([u8; KERNEL_STACK_SIZE]);

/// One stack per secondary processor, handed out in arrival order.
static mut AP_STACKS: [KernelStack; MAX_CPUS - 1] =
    [const { KernelStack([0; KERNEL_STACK_SIZE]) }; MAX_CPUS - 1];

global_asm!(
    r#"
    .pushsection .rodata.ap_trampoline, "a"
    .balign 16
    .code16
    .globl ap_trampoline_start
ap_trampoline_start:
    cli
    cld
    xorw %ax, %ax
    movw %ax, %ds
    lgdtl {launch} + (ap_trampoline_gdt_ptr - ap_trampoline_start)
    movl %cr0, %eax
    orl $1, %eax
    movl %eax, %cr0
    ljmpl $0x08, ${launch} + (1f - ap_trampoline_start)

    .code32
1:
    movw $0x10, %ax
    movw %ax, %ds
    movw %ax, %es
    movw %ax, %ss

    // PAE
    movl %cr4, %eax
    orl $(1 << 5), %eax
    movl %eax, %cr4

    movl {launch} + (ap_trampoline_cr3 - ap_trampoline_start), %eax
    movl %eax, %cr3

    // EFER.LME and EFER.NXE
    movl $0xC0000080, %ecx
    rdmsr
    orl $((1 << 8) | (1 << 11)), %eax
    wrmsr

    movl %cr0, %eax
    orl $0x80000000, %eax
    movl %eax, %cr0
    ljmpl $0x18, ${launch} + (2f - ap_trampoline_start)

    .code64
2:
    movw $0x10, %ax
    movw %ax, %ds
    movw %ax, %es
    movw %ax, %ss

    // rsp = stacks + (ticket + 1) * stack_size
    movl $1, %eax
    lock xaddl %eax, {launch} + (ap_trampoline_ticket - ap_trampoline_start)
    incl %eax
    imulq {launch} + (ap_trampoline_stack_size - ap_trampoline_start), %rax
    addq {launch} + (ap_trampoline_stacks - ap_trampoline_start), %rax
    movq %rax, %rsp
    xorl %ebp, %ebp

    movq {launch} + (ap_trampoline_entry - ap_trampoline_start), %rax
    callq *%rax
3:
    cli
    hlt
    jmp 3b

    .balign 8
ap_trampoline_gdt:
    .quad 0
    .quad 0x00CF9A000000FFFF
    .quad 0x00CF92000000FFFF
    .quad 0x00AF9A000000FFFF
ap_trampoline_gdt_ptr:
    .word ap_trampoline_gdt_ptr - ap_trampoline_gdt - 1
    .long {launch} + (ap_trampoline_gdt - ap_trampoline_start)

    .balign 8
    .globl ap_trampoline_cr3
ap_trampoline_cr3:
    .quad 0
    .globl ap_trampoline_stacks
ap_trampoline_stacks:
    .quad 0
    .globl ap_trampoline_stack_size
ap_trampoline_stack_size:
    .quad 0
    .globl ap_trampoline_entry
ap_trampoline_entry:
    .quad 0
    .globl ap_trampoline_ticket
ap_trampoline_ticket:
    .long 0
    .globl ap_trampoline_end
ap_trampoline_end:
    .popsection
"#,
    launch = const AP_LAUNCH_PHYS,
    options(att_syntax)
);

unsafe extern "C" {
    static ap_trampoline_start: u8;
    static ap_trampoline_end: u8;
    static ap_trampoline_cr3: u8;
    static ap_trampoline_stacks: u8;
    static ap_trampoline_stack_size: u8;
    static ap_trampoline_entry: u8;
    static ap_trampoline_ticket: u8;
}

/// Byte offset of `field` from the start of the trampoline.
fn offset_of_field(field: *const u8) -> usize {
    field.addr() - (&raw const ap_trampoline_start).addr()
}

/// # Safety
/// `page` must point at a writable copy of the trampoline.
unsafe fn patch<T>(page: *mut u8, field: *const u8, value: T) {
    unsafe {
        page.add(offset_of_field(field))
            .cast::<T>()
            .write_volatile(value);
    }
}

/// Copies the trampoline through the physical window.
#[derive(Debug, Clone, Copy)]
pub struct ApTrampoline {
    window: PhysWindow,
}

impl ApTrampoline {
    /// # Safety
    /// The window must map the launch page writable, and nothing else may
    /// live in that page.
    pub const unsafe fn new(window: PhysWindow) -> Self {
        Self { window }
    }
}

impl Trampoline for ApTrampoline {
    fn install(&self, launch_phys: u64) {
        assert_eq!(launch_phys, AP_LAUNCH_PHYS, "trampoline assembled for another page");

        let len = offset_of_field(&raw const ap_trampoline_end);
        assert!(len <= PAGE_SIZE, "trampoline larger than a page");

        let cr3 = read_cr3();
        assert!(cr3 < 1 << 32, "page tables above 4 GiB: {cr3:#x}");

        let Some(page) = self.window.ptr::<u8>(launch_phys) else {
            panic!("launch page {launch_phys:#x} outside the physical window");
        };

        // SAFETY: `page` is a whole page reserved for the trampoline (see
        // `ApTrampoline::new`); the source is the assembled code above.
        unsafe {
            core::ptr::copy_nonoverlapping(&raw const ap_trampoline_start, page, len);
            patch(page, &raw const ap_trampoline_cr3, cr3);
            patch(page, &raw const ap_trampoline_stacks, (&raw mut AP_STACKS).addr() as u64);
            patch(page, &raw const ap_trampoline_stack_size, KERNEL_STACK_SIZE as u64);
            patch(page, &raw const ap_trampoline_entry, crate::boot::ap_entry as usize as u64);
            patch(page, &raw const ap_trampoline_ticket, 0u32);
        }

        // The start-up IPIs are MMIO writes; the copy must land first.
        fence(Ordering::SeqCst);
    }
}
