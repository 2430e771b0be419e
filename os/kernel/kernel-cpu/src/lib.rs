//! # Processor management
//!
//! Finds the processors, gives each one its own descriptor table and
//! task-state block, and starts them.
//!
//! ```text
//! MADT ──► enumerate ──► CpuTable ──► bring_up_all ──► every CPU in late_init
//!              │                          │
//!              ▼                          ▼
//!      InterruptController         calibrate_timer (PIT)
//! ```
//!
//! ## Processor records
//!
//! Each [`Cpu`] takes one page from the kernel page pool and is never freed.
//! Logical id 0 is the first processor registered, which on every PC firmware
//! is the boot processor; the bring-up code still identifies the boot
//! processor by its local APIC id rather than trusting the order.
//!
//! ## Hardware
//!
//! Privileged instructions (`lgdt`, `ltr`, `lidt`) and the real-mode
//! trampoline are provided by the kernel image through [`CpuArch`] and
//! [`Trampoline`]; port and register access goes through the
//! [`kernel_intr::hw`] traits.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod bringup;
mod calibrate;
mod cpu;
mod descriptors;
mod enumerate;
mod topology;
mod tss;

pub use bringup::{
    BringUpError, BringUpState, CpuArch, Trampoline, bring_up_all, late_init, secondary_entry,
};
pub use calibrate::{Calibration, calibrate_timer};
pub use cpu::Cpu;
pub use descriptors::{
    GDT_ENTRIES, KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR, SegmentDescriptor, TSS_LIMIT,
    TSS_SELECTOR, TssDescriptorLow, USER_CODE_SELECTOR, USER_DATA_SELECTOR, gdt_entries,
};
pub use enumerate::{EnumerateError, enumerate, local_apic_base};
pub use topology::CpuTable;
pub use tss::Tss64;
