//! # Local APIC (xAPIC, memory-mapped)
//!
//! Each processor's own interrupt controller: it receives routed vectors,
//! runs the per-processor timer and sends inter-processor interrupts.
//!
//! ```text
//! offset  register              offset  register
//! 0x020   ID (bits 24..31)      0x300   ICR low
//! 0x030   version               0x310   ICR high (destination << 24)
//! 0x080   task priority         0x320   LVT timer
//! 0x0B0   EOI                   0x330   LVT thermal
//! 0x0D0   logical destination   0x340   LVT perf counters
//! 0x0E0   destination format    0x350   LVT LINT0
//! 0x0F0   spurious vector       0x360   LVT LINT1
//! 0x100   ISR (8 x 32 bits)     0x370   LVT error
//!                               0x380   timer initial count
//!                               0x390   timer current count
//!                               0x3E0   timer divide
//! ```

use log::debug;

use crate::hw::Mmio32;
use crate::vectors::{SPURIOUS_VECTOR, TIMER_VECTOR};

const REG_ID: usize = 0x020;
const REG_VERSION: usize = 0x030;
const REG_TPR: usize = 0x080;
const REG_EOI: usize = 0x0B0;
const REG_LDR: usize = 0x0D0;
const REG_DFR: usize = 0x0E0;
const REG_SPURIOUS: usize = 0x0F0;
const REG_ISR: usize = 0x100;
const REG_ICR_LOW: usize = 0x300;
const REG_ICR_HIGH: usize = 0x310;
const REG_LVT_TIMER: usize = 0x320;
const REG_LVT_THERMAL: usize = 0x330;
const REG_LVT_PERF: usize = 0x340;
const REG_LVT_LINT0: usize = 0x350;
const REG_LVT_LINT1: usize = 0x360;
const REG_LVT_ERROR: usize = 0x370;
const REG_TIMER_INITIAL: usize = 0x380;
const REG_TIMER_CURRENT: usize = 0x390;
const REG_TIMER_DIVIDE: usize = 0x3E0;

/// Mask bit of a local vector table entry.
pub const LVT_DISABLE: u32 = 0x1_0000;
const LVT_PERIODIC: u32 = 0x2_0000;
const SOFTWARE_ENABLE: u32 = 0x100;

/// ICR low fields for an INIT IPI (assert, level).
pub const IPI_INIT: u32 = 0x4500;
/// ICR low fields for a start-up IPI, without the vector.
pub const IPI_STARTUP: u32 = 0x4600;
const IPI_BUSY: u32 = 0x1000;

/// Timer divide configuration value for "divide by 2".
pub const TIMER_DIVIDE_BY_2: u32 = 0;

/// Driver for the calling processor's local APIC.
#[derive(Debug, Clone, Copy)]
pub struct LocalApic<R> {
    regs: R,
}

impl<R: Mmio32> LocalApic<R> {
    #[must_use]
    pub const fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Hardware ID of the calling processor.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn id(&self) -> u8 {
        (self.regs.read32(REG_ID) >> 24) as u8
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.regs.read32(REG_VERSION)
    }

    /// Everything except the timer: flat logical addressing, accept all
    /// priorities, every local source masked, software enable with the
    /// spurious vector.
    pub fn base_init(&self) {
        self.regs.write32(REG_DFR, 0xFFFF_FFFF);
        self.regs.write32(REG_LDR, 0);
        self.regs.write32(REG_TPR, 0);
        self.regs.write32(REG_TIMER_DIVIDE, TIMER_DIVIDE_BY_2);

        for lvt in [
            REG_LVT_TIMER,
            REG_LVT_THERMAL,
            REG_LVT_PERF,
            REG_LVT_LINT0,
            REG_LVT_LINT1,
            REG_LVT_ERROR,
        ] {
            self.regs.write32(lvt, LVT_DISABLE);
        }

        self.regs
            .write32(REG_SPURIOUS, u32::from(SPURIOUS_VECTOR) | SOFTWARE_ENABLE);
    }

    /// Send an inter-processor interrupt.
    ///
    /// Waits for the previous IPI to leave the command register, then writes
    /// the destination half before the half that triggers delivery.
    pub fn send_ipi(&self, apic_id: u8, low: u32) {
        while self.regs.read32(REG_ICR_LOW) & IPI_BUSY != 0 {
            core::hint::spin_loop();
        }

        debug!("IPI {low:#06x} -> APIC {apic_id}");
        self.regs.write32(REG_ICR_HIGH, u32::from(apic_id) << 24);
        self.regs.write32(REG_ICR_LOW, low);
    }

    pub fn send_init(&self, apic_id: u8) {
        self.send_ipi(apic_id, IPI_INIT);
    }

    /// Start-up IPI pointing at the page containing `launch_phys`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn send_startup(&self, apic_id: u8, launch_phys: u64) {
        debug_assert!(launch_phys < 0x10_0000 && launch_phys.trailing_zeros() >= 12);
        self.send_ipi(apic_id, IPI_STARTUP | ((launch_phys >> 12) as u32 & 0xFF));
    }

    pub fn eoi(&self) {
        self.regs.write32(REG_EOI, 0);
    }

    /// The highest vector currently in service, if any.
    ///
    /// Scans the eight in-service registers from the top; the highest set bit
    /// of the first non-zero register wins.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn highest_in_service(&self) -> Option<u8> {
        (0..8usize).rev().find_map(|index| {
            let bits = self.regs.read32(REG_ISR + index * 0x10);
            (bits != 0).then(|| (index * 32 + 31 - bits.leading_zeros() as usize) as u8)
        })
    }

    /// Unmask the timer in one-shot mode on the timer vector.
    pub fn arm_one_shot_timer(&self) {
        self.regs.write32(REG_LVT_TIMER, u32::from(TIMER_VECTOR));
    }

    pub fn set_initial_count(&self, count: u32) {
        self.regs.write32(REG_TIMER_INITIAL, count);
    }

    /// Mask the timer and return the count it stopped at.
    #[must_use]
    pub fn stop_timer(&self) -> u32 {
        self.regs.write32(REG_LVT_TIMER, LVT_DISABLE);
        self.regs.read32(REG_TIMER_CURRENT)
    }

    /// Fire the timer vector every `reload` bus ticks (after the divider).
    pub fn start_periodic_timer(&self, reload: u32) {
        self.regs
            .write32(REG_LVT_TIMER, u32::from(TIMER_VECTOR) | LVT_PERIODIC);
        self.regs.write32(REG_TIMER_INITIAL, reload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Regs {
        values: Mutex<std::collections::HashMap<usize, u32>>,
        writes: Mutex<Vec<(usize, u32)>>,
        busy_reads: AtomicU32,
    }

    impl Regs {
        fn set(&self, offset: usize, value: u32) {
            self.values.lock().unwrap().insert(offset, value);
        }

        fn writes(&self) -> Vec<(usize, u32)> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl Mmio32 for Regs {
        fn read32(&self, offset: usize) -> u32 {
            if offset == REG_ICR_LOW
                && self
                    .busy_reads
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
                    .is_ok()
            {
                return IPI_BUSY;
            }
            self.values.lock().unwrap().get(&offset).copied().unwrap_or(0)
        }

        fn write32(&self, offset: usize, value: u32) {
            self.values.lock().unwrap().insert(offset, value);
            self.writes.lock().unwrap().push((offset, value));
        }
    }

    #[test]
    fn id_is_top_byte() {
        let regs = Regs::default();
        regs.set(REG_ID, 0x0300_0000);
        assert_eq!(LocalApic::new(&regs).id(), 3);
    }

    #[test]
    fn base_init_sequence() {
        let regs = Regs::default();
        LocalApic::new(&regs).base_init();
        assert_eq!(
            regs.writes(),
            vec![
                (0x0E0, 0xFFFF_FFFF),
                (0x0D0, 0),
                (0x080, 0),
                (0x3E0, 0),
                (0x320, 0x1_0000),
                (0x330, 0x1_0000),
                (0x340, 0x1_0000),
                (0x350, 0x1_0000),
                (0x360, 0x1_0000),
                (0x370, 0x1_0000),
                (0x0F0, 0x120),
            ]
        );
    }

    #[test]
    fn ipi_waits_for_idle_and_writes_destination_first() {
        let regs = Regs::default();
        regs.busy_reads.store(3, Ordering::Relaxed);
        LocalApic::new(&regs).send_init(7);
        assert_eq!(regs.busy_reads.load(Ordering::Relaxed), 0);
        assert_eq!(regs.writes(), vec![(0x310, 7 << 24), (0x300, 0x4500)]);
    }

    #[test]
    fn startup_encodes_launch_page() {
        let regs = Regs::default();
        LocalApic::new(&regs).send_startup(1, 0x8000);
        assert_eq!(regs.writes(), vec![(0x310, 1 << 24), (0x300, 0x4608)]);
    }

    #[test]
    fn in_service_scan_prefers_highest() {
        let regs = Regs::default();
        let lapic = LocalApic::new(&regs);
        assert_eq!(lapic.highest_in_service(), None);

        regs.set(REG_ISR + 0x10, 1 << 1);
        assert_eq!(lapic.highest_in_service(), Some(33));

        regs.set(REG_ISR + 0x30, (1 << 3) | (1 << 5));
        assert_eq!(lapic.highest_in_service(), Some(0x65));

        regs.set(REG_ISR + 0x70, 1 << 31);
        assert_eq!(lapic.highest_in_service(), Some(0xFF));
    }

    #[test]
    fn periodic_timer() {
        let regs = Regs::default();
        LocalApic::new(&regs).start_periodic_timer(12_345);
        assert_eq!(regs.writes(), vec![(0x320, 33 | 0x2_0000), (0x380, 12_345)]);
    }

    #[test]
    fn stop_timer_masks_then_reads() {
        let regs = Regs::default();
        regs.set(REG_TIMER_CURRENT, 0xFFF0_0000);
        assert_eq!(LocalApic::new(&regs).stop_timer(), 0xFFF0_0000);
        assert_eq!(regs.writes(), vec![(0x320, 0x1_0000)]);
    }
}
