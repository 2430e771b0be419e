//! # Interrupt core
//!
//! Builds the vector table, drives the local and IO APICs, and turns every
//! interrupt into a call on the kernel's [`InterruptPolicy`].
//!
//! ```text
//! entry stub ──► InterruptContext ──► dispatch::handle
//!                                        │
//!            ┌──────────────┬────────────┼─────────────┬──────────────┐
//!            ▼              ▼            ▼             ▼              ▼
//!         panic!     user_exception  page_fault   timer_tick + EOI  irq + EOI
//! ```
//!
//! ## Vectors
//!
//! * `0..=19`: CPU exceptions, each with its own stub.
//! * `32`: local APIC spurious vector; never acknowledged.
//! * `33`: local APIC timer.
//! * `0x30..=0xFF`: routing-chip lines, all sharing one stub. The line is
//!   recovered from the local APIC in-service registers.
//!
//! The legacy 8259 PIC is masked and never used.
//!
//! ## Hardware access
//!
//! Everything goes through the [`hw`] traits, so the whole crate runs on the
//! host against fakes.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod context;
mod controller;
mod dispatch;
pub mod hw;
mod idt;
mod ioapic;
mod lapic;
mod pic;
mod vectors;

pub use context::InterruptContext;
pub use controller::InterruptController;
pub use dispatch::{InterruptPolicy, handle};
pub use idt::{
    DescriptorPointer, EntryStubs, IdtEntry, IdtEntryBuilder, IdtGateAttr, KERNEL_CODE_SELECTOR,
    VectorTable,
};
pub use ioapic::{RedirectionEntry, RoutingChip, RoutingChipError, RoutingChips};
pub use lapic::{IPI_INIT, IPI_STARTUP, LVT_DISABLE, LocalApic, TIMER_DIVIDE_BY_2};
pub use pic::disable_legacy_pic;
pub use vectors::{IRQ_BASE_VECTOR, InterruptVector, SPURIOUS_VECTOR, TIMER_VECTOR, VectorClass};
