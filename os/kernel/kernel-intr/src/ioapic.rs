//! # IO APIC routing chips
//!
//! Each IO APIC owns a contiguous range of global interrupt lines starting at
//! the base the firmware reports. Registers are reached indirectly: write the
//! register index to `IOREGSEL`, then read or write `IOWIN`.
//!
//! ```text
//! index        register
//! 0x00         ID
//! 0x01         version (bits 16..23: highest redirection entry)
//! 0x10 + 2n    redirection entry n, low dword
//! 0x11 + 2n    redirection entry n, high dword
//! ```

use bitfield_struct::bitfield;
use kernel_info::config::MAX_ROUTING_CHIPS;
use log::{debug, info};
use thiserror::Error;

use crate::hw::{Mmio32, MmioMapper};
use crate::vectors::IRQ_BASE_VECTOR;

const IOREGSEL: usize = 0x00;
const IOWIN: usize = 0x10;

const REG_ID: u32 = 0x00;
const REG_VERSION: u32 = 0x01;
const REG_REDIRECTION: u32 = 0x10;

/// One redirection table entry.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct RedirectionEntry {
    pub vector: u8,

    /// 0 fixed, 1 lowest priority, 2 SMI, 4 NMI, 5 INIT, 7 ExtINT.
    #[bits(3)]
    pub delivery_mode: u8,

    pub dest_logical: bool,
    pub pending: bool,
    pub active_low: bool,
    pub remote_irr: bool,
    pub level_triggered: bool,
    pub masked: bool,

    #[bits(39)]
    __: u64,

    /// APIC ID of the receiving processor.
    pub destination: u8,
}

impl RedirectionEntry {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn low(self) -> u32 {
        self.into_bits() as u32
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn high(self) -> u32 {
        (self.into_bits() >> 32) as u32
    }

    #[must_use]
    pub fn from_halves(low: u32, high: u32) -> Self {
        Self::from_bits((u64::from(high) << 32) | u64::from(low))
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RoutingChipError {
    #[error("IO APIC address is null")]
    NullAddress,
    #[error("IO APIC at {address:#x} is outside the physical window")]
    Unreachable { address: u64 },
    #[error("IO APIC probe failed: ID and version both read {id:#x}")]
    ProbeFailed { id: u32 },
    #[error("IO APIC table is full")]
    TableFull,
}

/// A registered chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingChip {
    pub address: u64,
    pub base_irq: u32,
    pub count: u32,
}

impl RoutingChip {
    #[must_use]
    pub const fn owns(&self, irq: u32) -> bool {
        irq >= self.base_irq && irq - self.base_irq < self.count
    }
}

/// The fixed-capacity table of registered chips, filled in discovery order.
pub struct RoutingChips<M: MmioMapper> {
    mapper: M,
    slots: [Option<RoutingChip>; MAX_ROUTING_CHIPS],
}

impl<M: MmioMapper> RoutingChips<M> {
    #[must_use]
    pub const fn new(mapper: M) -> Self {
        Self {
            mapper,
            slots: [None; MAX_ROUTING_CHIPS],
        }
    }

    /// Probe the chip at `address` and route all its lines, masked, to `bsp_apic_id`.
    ///
    /// Line `n` of the chip gets vector `IRQ_BASE_VECTOR + base_irq + n`,
    /// truncated to eight bits.
    ///
    /// # Errors
    /// Null or unmapped address, identical ID and version registers, or no
    /// free slot.
    #[allow(clippy::cast_possible_truncation)]
    pub fn register(
        &mut self,
        address: u64,
        base_irq: u32,
        bsp_apic_id: u8,
    ) -> Result<usize, RoutingChipError> {
        if address == 0 {
            return Err(RoutingChipError::NullAddress);
        }

        let regs = self
            .mapper
            .map(address)
            .ok_or(RoutingChipError::Unreachable { address })?;

        let id = read(&regs, REG_ID);
        let version = read(&regs, REG_VERSION);
        if id == version {
            return Err(RoutingChipError::ProbeFailed { id });
        }

        let count = ((version >> 16) & 0xFF) + 1;
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(RoutingChipError::TableFull)?;

        for line in 0..count {
            let vector = u32::from(IRQ_BASE_VECTOR)
                .wrapping_add(base_irq)
                .wrapping_add(line) as u8;
            let entry = RedirectionEntry::new()
                .with_vector(vector)
                .with_masked(true)
                .with_destination(bsp_apic_id);
            write_entry(&regs, line, entry);
        }

        self.slots[slot] = Some(RoutingChip {
            address,
            base_irq,
            count,
        });
        info!(
            "IO APIC {slot} at {address:#x}: lines {base_irq}..{}",
            base_irq.saturating_add(count)
        );
        Ok(slot)
    }

    /// Apply an ISA interrupt source override.
    ///
    /// Rewrites the vector of the entry for `isa_irq` to the one of
    /// `routed_irq`, and sets polarity and trigger mode from the MPS INTI
    /// `flags`: `0b11` in bits 0..1 selects active low, `0b11` in bits 2..3
    /// selects level triggered. Returns `false` if no chip owns `isa_irq`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply_isa_override(&mut self, isa_irq: u8, routed_irq: u32, flags: u16) -> bool {
        let isa = u32::from(isa_irq);
        let Some(chip) = self.chips().find(|chip| chip.owns(isa)).copied() else {
            debug!("ISA override {isa_irq} -> {routed_irq} dropped: no IO APIC owns it");
            return false;
        };
        let Some(regs) = self.mapper.map(chip.address) else {
            return false;
        };

        let line = isa - chip.base_irq;
        let reg = REG_REDIRECTION + 2 * line;
        let entry = RedirectionEntry::from_halves(read(&regs, reg), 0)
            .with_vector(u32::from(IRQ_BASE_VECTOR).wrapping_add(routed_irq) as u8)
            .with_active_low(flags & 0b11 == 0b11)
            .with_level_triggered((flags >> 2) & 0b11 == 0b11);
        write(&regs, reg, entry.low());

        debug!("ISA override {isa_irq} -> {routed_irq} (flags {flags:#x})");
        true
    }

    /// Registered chips in discovery order.
    pub fn chips(&self) -> impl Iterator<Item = &RoutingChip> {
        self.slots.iter().map_while(Option::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chips().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots[0].is_none()
    }

    /// Read back redirection entry `line` of the chip in `slot`.
    #[must_use]
    pub fn entry(&self, slot: usize, line: u32) -> Option<RedirectionEntry> {
        let chip = self.slots.get(slot).copied().flatten()?;
        if line >= chip.count {
            return None;
        }
        let regs = self.mapper.map(chip.address)?;
        let reg = REG_REDIRECTION + 2 * line;
        Some(RedirectionEntry::from_halves(
            read(&regs, reg),
            read(&regs, reg + 1),
        ))
    }
}

fn read(regs: &impl Mmio32, reg: u32) -> u32 {
    regs.write32(IOREGSEL, reg);
    regs.read32(IOWIN)
}

fn write(regs: &impl Mmio32, reg: u32, value: u32) {
    regs.write32(IOREGSEL, reg);
    regs.write32(IOWIN, value);
}

fn write_entry(regs: &impl Mmio32, line: u32, entry: RedirectionEntry) {
    let reg = REG_REDIRECTION + 2 * line;
    write(regs, reg + 1, entry.high());
    write(regs, reg, entry.low());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_bit_positions() {
        let e = RedirectionEntry::new()
            .with_vector(0x31)
            .with_active_low(true)
            .with_level_triggered(true)
            .with_masked(true)
            .with_destination(5);
        assert_eq!(e.low(), 0x31 | (1 << 13) | (1 << 15) | (1 << 16));
        assert_eq!(e.high(), 5 << 24);
        assert_eq!(RedirectionEntry::from_halves(e.low(), e.high()), e);
    }

    #[test]
    fn ownership_range() {
        let chip = RoutingChip {
            address: 0xFEC0_0000,
            base_irq: 24,
            count: 24,
        };
        assert!(!chip.owns(23));
        assert!(chip.owns(24));
        assert!(chip.owns(47));
        assert!(!chip.owns(48));
    }
}
