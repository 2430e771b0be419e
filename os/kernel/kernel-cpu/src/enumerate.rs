//! # Topology enumeration
//!
//! The boot processor, identified by its own local APIC id register, is
//! always logical id 0. One pass over the MADT then registers the other
//! processors, routing chips and ISA overrides in table order. Without a
//! MADT, or when it names no routing chip, the PC default fills the gap:
//! one IO APIC at `0xFEC0_0000` serving lines from 0, with ISA line 0
//! (the PIT) arriving on line 2.

use kernel_acpi::{Madt, MadtEntry};
use kernel_alloc::PageAllocator;
use kernel_info::memory::{IO_APIC_DEFAULT, LOCAL_APIC_DEFAULT};
use kernel_intr::hw::{Mmio32, MmioMapper};
use kernel_intr::{InterruptController, LocalApic, RoutingChipError};
use log::{debug, info, warn};
use thiserror::Error;

use crate::cpu::Cpu;
use crate::topology::CpuTable;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EnumerateError {
    #[error("processors were already enumerated")]
    AlreadyEnumerated,
    #[error("out of pages for processor records")]
    OutOfPages,
    #[error(transparent)]
    RoutingChip(#[from] RoutingChipError),
}

/// Physical address of the local APIC register page.
#[must_use]
pub fn local_apic_base(topology: Option<&Madt<'_>>) -> u64 {
    topology
        .map(Madt::local_apic_address)
        .filter(|&address| address != 0)
        .map_or(LOCAL_APIC_DEFAULT, u64::from)
}

/// Register every processor and routing chip the firmware describes.
///
/// Must run once, on the boot processor, before any other processor is
/// started. `lapic` is the boot processor's local APIC; routing-chip lines
/// start out directed at it.
///
/// # Errors
/// * [`EnumerateError::AlreadyEnumerated`] if `cpus` is not empty.
/// * [`EnumerateError::OutOfPages`] if a processor record cannot be
///   allocated.
/// * [`EnumerateError::RoutingChip`] if a routing chip cannot be registered.
pub fn enumerate<R, M>(
    cpus: &mut CpuTable,
    topology: Option<&Madt<'_>>,
    lapic: &LocalApic<R>,
    pages: &PageAllocator,
    interrupts: &mut InterruptController<M>,
) -> Result<(), EnumerateError>
where
    R: Mmio32,
    M: MmioMapper,
{
    if !cpus.is_empty() {
        return Err(EnumerateError::AlreadyEnumerated);
    }

    let bsp = lapic.id();
    register_cpu(cpus, pages, 0, bsp)?;

    if let Some(madt) = topology {
        for entry in madt.entries() {
            debug!("MADT: {entry:?}");
            match entry {
                MadtEntry::LocalApic { apic_id, .. } if entry.is_enabled() && apic_id != bsp => {
                    if let Some(id) = cpus.next_id() {
                        register_cpu(cpus, pages, id, apic_id)?;
                    } else {
                        warn!("Ignoring processor with APIC id {apic_id}: table full");
                    }
                }
                MadtEntry::IoApic {
                    address, gsi_base, ..
                } => {
                    interrupts.register_routing_chip(u64::from(address), gsi_base, bsp)?;
                }
                MadtEntry::InterruptOverride {
                    source, gsi, flags, ..
                } => {
                    interrupts.apply_isa_override(source, gsi, flags);
                }
                MadtEntry::LocalApic { .. } | MadtEntry::Other { .. } => {}
            }
        }
    } else {
        info!("No MADT, assuming a uniprocessor PC");
    }

    if interrupts.routing_chips().is_empty() {
        interrupts.register_routing_chip(IO_APIC_DEFAULT, 0, bsp)?;
        interrupts.apply_isa_override(0, 2, 0);
    }

    info!(
        "{} processor(s), {} IO APIC(s)",
        cpus.len(),
        interrupts.routing_chips().len()
    );
    Ok(())
}

fn register_cpu(
    cpus: &mut CpuTable,
    pages: &PageAllocator,
    id: usize,
    apic_id: u8,
) -> Result<(), EnumerateError> {
    let page = pages.zallocate().ok_or(EnumerateError::OutOfPages)?;
    let cpu = Cpu::place(page, id, apic_id);
    info!("CPU {id}: APIC id {apic_id}");
    cpus.push(cpu);
    Ok(())
}
