//! # SMP bring-up
//!
//! Driven by the boot processor:
//!
//! ```text
//! BSP                                     each AP
//! ───                                     ───────
//! local APIC base init
//! INIT ──────────────────────────────────► reset, wait for SIPI
//! calibrate timer (10 ms)
//! copy trampoline to 0x8000
//! SIPI ──────────────────────────────────► trampoline → secondary_entry
//! late_init                                 local APIC base init
//!                                           late_init
//! wait until every processor arrived ◄───── arrive
//! ```
//!
//! `late_init` loads the processor's own descriptor table and task register,
//! the shared vector table, starts the periodic timer and checks in. There is
//! no timeout: a processor that never arrives stalls the boot processor.

use kernel_info::memory::AP_LAUNCH_PHYS;
use kernel_intr::hw::{Mmio32, PortIo};
use kernel_intr::{DescriptorPointer, LocalApic, VectorTable};
use kernel_sync::{ArrivalCounter, SyncOnceCell};
use log::{debug, info};
use thiserror::Error;

use crate::calibrate::{Calibration, calibrate_timer};
use crate::cpu::Cpu;
use crate::topology::CpuTable;

/// Privileged table loads for the calling processor.
pub trait CpuArch {
    /// Load `gdt`, reload CS with
    /// [`KERNEL_CODE_SELECTOR`](crate::KERNEL_CODE_SELECTOR) and the data
    /// segment registers with
    /// [`KERNEL_DATA_SELECTOR`](crate::KERNEL_DATA_SELECTOR), load the task
    /// register with [`TSS_SELECTOR`](crate::TSS_SELECTOR), then load `idt`.
    ///
    /// Both tables outlive the processor.
    fn load_tables(&self, gdt: DescriptorPointer, idt: DescriptorPointer);
}

/// The real-mode start-up code for secondary processors.
pub trait Trampoline {
    /// Copy the code to `launch_phys` and fill in whatever it needs to reach
    /// [`secondary_entry`] in long mode.
    fn install(&self, launch_phys: u64);
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BringUpError {
    #[error("no processor record for APIC id {apic_id}")]
    UnknownProcessor { apic_id: u8 },
    #[error("local timer was not calibrated")]
    NotCalibrated,
    #[error("processors were already started")]
    AlreadyStarted,
}

/// State shared between the boot processor and the processors it starts.
#[derive(Default)]
pub struct BringUpState {
    up: ArrivalCounter,
    calibration: SyncOnceCell<Calibration>,
}

impl BringUpState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            up: ArrivalCounter::new(),
            calibration: SyncOnceCell::new(),
        }
    }

    /// Bus frequency and timer reload, once the boot processor measured them.
    #[must_use]
    pub fn calibration(&self) -> Option<Calibration> {
        self.calibration.get().copied()
    }

    /// Processors that finished [`late_init`].
    #[must_use]
    pub fn processors_up(&self) -> u32 {
        self.up.arrived()
    }
}

/// Final per-processor step: load tables, start the timer, check in.
///
/// # Errors
/// [`BringUpError::NotCalibrated`] if the boot processor has not calibrated
/// the timer yet.
pub fn late_init<R: Mmio32>(
    cpu: &'static Cpu,
    state: &BringUpState,
    lapic: &LocalApic<R>,
    arch: &impl CpuArch,
    vectors: &'static VectorTable,
) -> Result<(), BringUpError> {
    let reload = state.calibration().ok_or(BringUpError::NotCalibrated)?.reload;

    arch.load_tables(cpu.gdt_pointer(), vectors.pointer());
    lapic.start_periodic_timer(reload);

    let up = state.up.arrive();
    debug!("CPU {} (APIC {}) up, {up} running", cpu.id, cpu.apic_id);
    Ok(())
}

/// Entry point of a secondary processor once the trampoline reached long
/// mode.
///
/// # Errors
/// See [`BringUpError`].
pub fn secondary_entry<R: Mmio32>(
    state: &BringUpState,
    cpus: &CpuTable,
    lapic: &LocalApic<R>,
    arch: &impl CpuArch,
    vectors: &'static VectorTable,
) -> Result<&'static Cpu, BringUpError> {
    lapic.base_init();
    let cpu = cpus
        .current(lapic)
        .ok_or(BringUpError::UnknownProcessor { apic_id: lapic.id() })?;
    late_init(cpu, state, lapic, arch, vectors)?;
    Ok(cpu)
}

/// Start every registered processor and wait until all of them are running.
///
/// Returns the boot processor's record.
///
/// # Errors
/// See [`BringUpError`].
#[allow(clippy::cast_possible_truncation)]
pub fn bring_up_all<R: Mmio32>(
    state: &BringUpState,
    cpus: &CpuTable,
    lapic: &LocalApic<R>,
    io: &impl PortIo,
    trampoline: &impl Trampoline,
    arch: &impl CpuArch,
    vectors: &'static VectorTable,
) -> Result<&'static Cpu, BringUpError> {
    if state.processors_up() != 0 || state.calibration().is_some() {
        return Err(BringUpError::AlreadyStarted);
    }

    let bsp_apic = lapic.id();
    let bsp = cpus
        .current(lapic)
        .ok_or(BringUpError::UnknownProcessor { apic_id: bsp_apic })?;
    let secondaries = || cpus.iter().filter(move |cpu| cpu.apic_id != bsp_apic);

    lapic.base_init();

    for cpu in secondaries() {
        lapic.send_init(cpu.apic_id);
    }

    state
        .calibration
        .set(calibrate_timer(lapic, io))
        .map_err(|_| BringUpError::AlreadyStarted)?;

    if cpus.len() > 1 {
        trampoline.install(AP_LAUNCH_PHYS);
    }

    for cpu in secondaries() {
        lapic.send_startup(cpu.apic_id, AP_LAUNCH_PHYS);
    }

    late_init(bsp, state, lapic, arch, vectors)?;

    // At most MAX_CPUS (256) entries.
    let expected = cpus.len() as u32;
    state.up.wait_for(expected);

    info!("All {expected} processor(s) up");
    Ok(bsp)
}
