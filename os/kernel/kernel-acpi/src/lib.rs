//! # ACPI table discovery
//!
//! Just enough ACPI to find the processors and interrupt routing chips of a
//! BIOS-booted x86-64 machine. The kernel never interprets AML; it only walks
//! the static tables firmware leaves in low memory.
//!
//! ```text
//! EBDA / BIOS ROM scan
//!     ↓
//! RSDP ("RSD PTR ", 16-byte aligned)
//!     ↓
//! RSDT (32-bit entries)   ── or ──   XSDT (64-bit entries, ACPI 2.0+)
//!     ↓
//! MADT ("APIC"): local APICs, IO APICs, interrupt source overrides
//! ```
//!
//! ## Validation
//!
//! Every structure is accepted only if its signature matches and its bytes
//! sum to zero modulo 256. A table that fails either check is skipped as if
//! it were absent; nothing in this crate panics on malformed firmware.
//!
//! ## Physical memory access
//!
//! All reads go through [`PhysMapRo`], so the same parsers run against the
//! kernel's physical window and against plain byte buffers in host tests.
//! Implementations may return a slice shorter than requested when the range
//! is not reachable; parsers treat a short slice as a missing table.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod madt;
mod rsdp;
mod sdt;

pub use madt::{Madt, MadtEntries, MadtEntry};
pub use rsdp::{BIOS_ROM_WINDOW, EBDA_WINDOW, RootPointer, find_root_pointer, scan_window};
pub use sdt::{RootTable, Sdt, SdtHeader, find_topology_table};

/// Map a physical region and return a *read-only* byte slice for its contents.
/// You provide the implementation (identity map, physical window, etc.).
pub trait PhysMapRo {
    /// # Safety
    /// The implementor must ensure the returned slice is valid for as many
    /// bytes as it reports, and never longer than `len`.
    unsafe fn map_ro<'a>(&self, paddr: u64, len: usize) -> &'a [u8];
}

impl<T: PhysMapRo + ?Sized> PhysMapRo for &T {
    unsafe fn map_ro<'a>(&self, paddr: u64, len: usize) -> &'a [u8] {
        unsafe { (**self).map_ro(paddr, len) }
    }
}

/// Byte sum modulo 256; valid ACPI structures sum to zero.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |a, &b| a.wrapping_add(b))
}
