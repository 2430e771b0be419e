//! # MADT (Multiple APIC Description Table)
//!
//! ```text
//! offset  size  field
//! 0       36    SdtHeader ("APIC")
//! 36      4     local APIC physical address
//! 40      4     flags
//! 44      ...   variable-length entries: [type u8][length u8][payload...]
//! ```

use crate::PhysMapRo;
use crate::sdt::Sdt;

const LOCAL_APIC: u8 = 0;
const IO_APIC: u8 = 1;
const INTERRUPT_OVERRIDE: u8 = 2;

/// A validated MADT.
#[derive(Debug, Clone, Copy)]
pub struct Madt<'a> {
    body: &'a [u8],
}

impl<'a> Madt<'a> {
    pub const SIGNATURE: &'static [u8; 4] = b"APIC";

    /// Map and verify the MADT at `paddr`.
    ///
    /// # Safety
    /// `map` must be able to map `paddr` for reading.
    #[must_use]
    pub unsafe fn load(map: &impl PhysMapRo, paddr: u64) -> Option<Self> {
        let sdt = unsafe { Sdt::load(map, paddr, Self::SIGNATURE) }?;
        Self::from_sdt(sdt)
    }

    /// View an already verified table as a MADT.
    #[must_use]
    pub fn from_sdt(sdt: Sdt<'a>) -> Option<Self> {
        let body = sdt.body();
        (sdt.signature() == *Self::SIGNATURE && body.len() >= 8).then_some(Self { body })
    }

    /// Physical address of the local APIC register page.
    #[must_use]
    pub fn local_apic_address(&self) -> u32 {
        read_u32(self.body, 0)
    }

    #[must_use]
    pub fn flags(&self) -> u32 {
        read_u32(self.body, 4)
    }

    #[must_use]
    pub fn entries(&self) -> MadtEntries<'a> {
        MadtEntries {
            bytes: &self.body[8..],
        }
    }
}

/// One interrupt controller structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MadtEntry {
    /// A processor's local APIC.
    LocalApic {
        processor_id: u8,
        apic_id: u8,
        flags: u32,
    },
    /// An IO APIC and the first global interrupt line it serves.
    IoApic { id: u8, address: u32, gsi_base: u32 },
    /// An ISA interrupt routed to a different global line.
    InterruptOverride {
        bus: u8,
        source: u8,
        gsi: u32,
        flags: u16,
    },
    /// Anything the kernel does not use, including truncated known entries.
    Other { kind: u8, length: u8 },
}

impl MadtEntry {
    /// Whether a local APIC entry describes a usable processor.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::LocalApic { flags, .. } if *flags & 1 != 0)
    }

    fn parse(raw: &[u8]) -> Self {
        let kind = raw[0];
        let length = raw[1];
        match kind {
            LOCAL_APIC if raw.len() >= 8 => Self::LocalApic {
                processor_id: raw[2],
                apic_id: raw[3],
                flags: read_u32(raw, 4),
            },
            IO_APIC if raw.len() >= 12 => Self::IoApic {
                id: raw[2],
                address: read_u32(raw, 4),
                gsi_base: read_u32(raw, 8),
            },
            INTERRUPT_OVERRIDE if raw.len() >= 10 => Self::InterruptOverride {
                bus: raw[2],
                source: raw[3],
                gsi: read_u32(raw, 4),
                flags: u16::from_le_bytes([raw[8], raw[9]]),
            },
            _ => Self::Other { kind, length },
        }
    }
}

/// Iterator over MADT entries.
///
/// Stops at the first entry whose length is below two or runs past the
/// end of the table.
#[derive(Debug, Clone)]
pub struct MadtEntries<'a> {
    bytes: &'a [u8],
}

impl Iterator for MadtEntries<'_> {
    type Item = MadtEntry;

    fn next(&mut self) -> Option<MadtEntry> {
        if self.bytes.len() < 2 {
            return None;
        }

        let length = usize::from(self.bytes[1]);
        if length < 2 || length > self.bytes.len() {
            self.bytes = &[];
            return None;
        }

        let (raw, rest) = self.bytes.split_at(length);
        self.bytes = rest;
        Some(MadtEntry::parse(raw))
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
