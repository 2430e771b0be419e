//! # Vector table (IDT)
//!
//! One 256-entry table shared by every processor. The boot processor builds
//! it once; each processor then loads it with `lidt` during late init.
//!
//! ```text
//! vector      stub              gate
//! 0..=19      per exception     0x8E (0xEE for #BP)
//! 32          spurious          0x8E
//! 33          local timer       0x8E
//! 0x30..=0xFF shared IRQ stub   0x8E
//! others      not present
//! ```
//!
//! Exactly one vector, the breakpoint, may be raised from ring 3 with `int3`.

use bitfield_struct::bitfield;
use core::ops::{Index, IndexMut};

use crate::vectors::{IRQ_BASE_VECTOR, InterruptVector, SPURIOUS_VECTOR, TIMER_VECTOR};

/// GDT selector of the kernel code segment every gate runs in.
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;

const _: () = assert!(size_of::<IdtEntry>() == 16);
const _: () = assert!(align_of::<VectorTable>() == 16);

/// The middle two bytes of a gate: IST index, type and attributes.
///
/// ```text
/// 15  14 13  12  11    8 7     3 2   0
/// | P | DPL | S | type | 00000 | IST |
/// ```
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct IdtGateAttr {
    /// Interrupt stack table slot; 0 keeps the current stack.
    #[bits(3)]
    pub ist: u8,

    #[bits(5)]
    __zero0: u8,

    /// 0xE interrupt gate, 0xF trap gate.
    #[bits(4)]
    pub typ: u8,

    /// Must be clear for interrupt and trap gates.
    #[bits(1)]
    pub s: bool,

    /// Lowest privilege level allowed to raise the vector with `int n`.
    #[bits(2)]
    pub dpl: u8,

    #[bits(1)]
    pub present: bool,
}

impl IdtGateAttr {
    #[inline]
    #[must_use]
    pub const fn interrupt_gate() -> Self {
        Self::new().with_typ(0xE).with_s(false)
    }

    /// The high byte, as it appears in the Intel manuals (0x8E, 0xEE, ...).
    #[must_use]
    pub const fn type_byte(self) -> u8 {
        self.into_bits().to_le_bytes()[1]
    }
}

/// Operand of `lidt` and `lgdt`.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct DescriptorPointer {
    pub limit: u16,
    pub base: u64,
}

/// One 16-byte x86-64 gate descriptor.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IdtEntry {
    offset_lo: u16,
    selector: u16,
    ist_type: u16,
    offset_mid: u16,
    offset_hi: u32,
    zero: u32,
}

impl IdtEntry {
    /// A zeroed, non-present entry.
    pub const MISSING: Self = Self {
        offset_lo: 0,
        selector: 0,
        ist_type: IdtGateAttr::new().into_bits(),
        offset_mid: 0,
        offset_hi: 0,
        zero: 0,
    };

    /// Point this entry at `handler` and return a builder for the rest.
    ///
    /// Defaults: kernel code selector, DPL 0, interrupt gate, no IST, not present.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn set_handler(&mut self, handler: u64) -> IdtEntryBuilder<'_> {
        self.offset_lo = (handler & 0xFFFF) as u16;
        self.offset_mid = ((handler >> 16) & 0xFFFF) as u16;
        self.offset_hi = (handler >> 32) as u32;
        self.selector = KERNEL_CODE_SELECTOR;
        self.ist_type = IdtGateAttr::interrupt_gate().into_bits();
        self.zero = 0;

        IdtEntryBuilder { entry: self }
    }

    #[must_use]
    pub fn handler(&self) -> u64 {
        (u64::from(self.offset_hi) << 32) | (u64::from(self.offset_mid) << 16) | u64::from(self.offset_lo)
    }

    #[must_use]
    pub const fn selector(&self) -> u16 {
        self.selector
    }

    #[must_use]
    pub const fn attributes(&self) -> IdtGateAttr {
        IdtGateAttr::from_bits(self.ist_type)
    }

    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.attributes().present()
    }
}

/// Fluent builder for an [`IdtEntry`].
pub struct IdtEntryBuilder<'a> {
    entry: &'a mut IdtEntry,
}

impl IdtEntryBuilder<'_> {
    #[inline]
    pub const fn present(self, p: bool) -> Self {
        let bf = IdtGateAttr::from_bits(self.entry.ist_type).with_present(p);
        self.entry.ist_type = bf.into_bits();
        self
    }

    #[inline]
    pub fn dpl(self, dpl: u8) -> Self {
        debug_assert!(dpl <= 3);
        let bf = IdtGateAttr::from_bits(self.entry.ist_type).with_dpl(dpl);
        self.entry.ist_type = bf.into_bits();
        self
    }
}

/// Addresses of the low-level entry stubs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStubs {
    /// One stub per exception, in the order of [`InterruptVector::EXCEPTIONS`].
    pub exceptions: [u64; InterruptVector::EXCEPTIONS.len()],
    pub spurious: u64,
    pub timer: u64,
    /// Shared by every routing-chip vector.
    pub irq: u64,
}

/// The 256-entry vector table.
#[repr(C, align(16))]
pub struct VectorTable {
    entries: [IdtEntry; 256],
}

impl Default for VectorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorTable {
    /// A table with every gate marked not present.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::MISSING; 256],
        }
    }

    /// Replace every entry from `stubs`.
    ///
    /// Rebuilding is idempotent: entries not named below are reset to missing.
    pub fn build(&mut self, stubs: &EntryStubs) {
        self.entries = [IdtEntry::MISSING; 256];

        for (&vector, &stub) in InterruptVector::EXCEPTIONS.iter().zip(&stubs.exceptions) {
            let gate = self[vector.number()].set_handler(stub).present(true);
            if vector == InterruptVector::Breakpoint {
                gate.dpl(3);
            }
        }

        self[SPURIOUS_VECTOR].set_handler(stubs.spurious).present(true);
        self[TIMER_VECTOR].set_handler(stubs.timer).present(true);

        for vector in IRQ_BASE_VECTOR..=u8::MAX {
            self[vector].set_handler(stubs.irq).present(true);
        }
    }

    /// The `lidt` operand for this table at its current address.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pointer(&self) -> DescriptorPointer {
        DescriptorPointer {
            limit: (size_of::<Self>() - 1) as u16,
            base: core::ptr::from_ref(self) as u64,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &IdtEntry> {
        self.entries.iter()
    }
}

impl Index<u8> for VectorTable {
    type Output = IdtEntry;
    fn index(&self, i: u8) -> &Self::Output {
        &self.entries[usize::from(i)]
    }
}

impl IndexMut<u8> for VectorTable {
    fn index_mut(&mut self, i: u8) -> &mut Self::Output {
        &mut self.entries[usize::from(i)]
    }
}
