//! # Interrupt entry stubs
//!
//! Every present gate points at one of the stubs below. A stub pushes a zero
//! error code if the CPU did not push one, then its vector number, and joins
//! [`interrupt_common`], which completes an [`InterruptContext`] on the stack
//! and hands it to [`kernel_intr::handle`].
//!
//! ```text
//! high  ss, rsp, rflags, cs, rip   pushed by the CPU
//!       error code                 CPU or stub
//!       vector                     stub
//!       r11 .. rcx, rax            interrupt_common
//! low   ◄── rsp = &InterruptContext
//! ```
//!
//! The CPU aligns RSP to 16 bytes before pushing its frame, and the context
//! is 16 quadwords, so the call into Rust happens on an aligned stack.

use core::arch::naked_asm;

use kernel_intr::{EntryStubs, InterruptContext, InterruptVector};

macro_rules! entry_stub {
    ($name:ident, $vector:expr) => {
        #[unsafe(naked)]
        extern "C" fn $name() {
            naked_asm!(
                "push 0",
                "push {vector}",
                "jmp {common}",
                vector = const $vector.number(),
                common = sym interrupt_common,
            )
        }
    };
    ($name:ident, $vector:expr, error_code) => {
        #[unsafe(naked)]
        extern "C" fn $name() {
            naked_asm!(
                "push {vector}",
                "jmp {common}",
                vector = const $vector.number(),
                common = sym interrupt_common,
            )
        }
    };
}

entry_stub!(divide_error, InterruptVector::DivideError);
entry_stub!(debug, InterruptVector::Debug);
entry_stub!(breakpoint, InterruptVector::Breakpoint);
entry_stub!(invalid_opcode, InterruptVector::InvalidOpcode);
entry_stub!(device_not_available, InterruptVector::DeviceNotAvailable);
entry_stub!(double_fault, InterruptVector::DoubleFault, error_code);
entry_stub!(invalid_tss, InterruptVector::InvalidTss, error_code);
entry_stub!(segment_not_present, InterruptVector::SegmentNotPresent, error_code);
entry_stub!(stack_fault, InterruptVector::StackFault, error_code);
entry_stub!(general_protection, InterruptVector::GeneralProtection, error_code);
entry_stub!(page_fault, InterruptVector::PageFault, error_code);
entry_stub!(x87_fpu, InterruptVector::X87Fpu);
entry_stub!(alignment_check, InterruptVector::AlignmentCheck, error_code);
entry_stub!(machine_check, InterruptVector::MachineCheck);
entry_stub!(simd, InterruptVector::Simd);
entry_stub!(spurious, InterruptVector::Spurious);
entry_stub!(timer, InterruptVector::Timer);
entry_stub!(irq, InterruptVector::Irq);

#[unsafe(naked)]
extern "C" fn interrupt_common() {
    naked_asm!(
        "push r11", "push r10", "push r9", "push r8",
        "push rdi", "push rsi", "push rdx", "push rcx", "push rax",
        "cld",
        "mov rdi, rsp",
        "call {entry}",
        "pop rax", "pop rcx", "pop rdx", "pop rsi", "pop rdi",
        "pop r8", "pop r9", "pop r10", "pop r11",
        // vector and error code
        "add rsp, 16",
        "iretq",
        entry = sym interrupt_entry,
    )
}

extern "C" fn interrupt_entry(ctx: &InterruptContext) {
    let Some(lapic) = crate::boot::LAPIC.get() else {
        panic!("Interrupt {} before local APIC setup", ctx.vector);
    };
    kernel_intr::handle(ctx, lapic, &crate::boot::POLICY);
}

fn address(stub: extern "C" fn()) -> u64 {
    stub as usize as u64
}

/// Stub addresses for [`VectorTable::build`](kernel_intr::VectorTable::build).
pub fn entry_stubs() -> EntryStubs {
    EntryStubs {
        exceptions: [
            address(divide_error),
            address(debug),
            address(breakpoint),
            address(invalid_opcode),
            address(device_not_available),
            address(double_fault),
            address(invalid_tss),
            address(segment_not_present),
            address(stack_fault),
            address(general_protection),
            address(page_fault),
            address(x87_fpu),
            address(alignment_check),
            address(machine_check),
            address(simd),
        ],
        spurious: address(spurious),
        timer: address(timer),
        irq: address(irq),
    }
}
