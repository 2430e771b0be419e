//! # Local timer calibration
//!
//! The local APIC timer runs off the external bus clock, whose frequency is
//! not reported anywhere. It is measured against PIT channel 2, which runs at
//! a fixed 1.193182 MHz and whose output can be polled through port 0x61
//! without taking an interrupt:
//!
//! 1. Gate channel 2 on, program it as a one-shot of 0x2E9B counts (10 ms).
//! 2. Pulse the gate to load the count, and start the local timer counting
//!    down from `0xFFFF_FFFF`.
//! 3. Spin until the channel 2 output goes high, then stop the local timer.
//!
//! The local timer divides the bus clock by 2, so the elapsed count times 2
//! is the number of bus cycles in 10 ms.

use core::hint::spin_loop;

use kernel_info::config::TICK_HZ;
use kernel_intr::LocalApic;
use kernel_intr::hw::{Mmio32, PortIo};
use log::info;

/// PC speaker / NMI status and control.
const PORT_SPEAKER: u16 = 0x61;
/// PIT mode/command register.
const PORT_PIT_COMMAND: u16 = 0x43;
/// PIT channel 2 data.
const PORT_PIT_CHANNEL2: u16 = 0x42;

const GATE_MASK: u8 = 0xFC;
const GATE_ON: u8 = 0x01;
const OUTPUT_HIGH: u8 = 0x20;

/// Channel 2, lobyte/hibyte, mode 1 (hardware one-shot), binary.
const CHANNEL2_ONE_SHOT: u8 = 0xB2;
/// 10 ms at 1.193182 MHz.
const WINDOW_COUNT: u16 = 0x2E9B;
const WINDOWS_PER_SECOND: u64 = 100;
const LOCAL_TIMER_DIVIDER: u64 = 2;

/// Result of measuring the local timer against the PIT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    /// External bus frequency in Hz.
    pub bus_hz: u64,
    /// Periodic reload value for [`TICK_HZ`] interrupts per second.
    pub reload: u32,
}

impl Calibration {
    /// Derive the bus frequency and reload from the local timer's remaining
    /// count after one 10 ms window.
    #[must_use]
    pub fn from_remaining(remaining: u32) -> Self {
        let elapsed = u64::from(u32::MAX - remaining);
        let bus_hz = elapsed * LOCAL_TIMER_DIVIDER * WINDOWS_PER_SECOND;
        let reload = u32::try_from(bus_hz / TICK_HZ).unwrap_or(u32::MAX);
        Self { bus_hz, reload }
    }
}

/// Measure the bus clock. Interrupts must be off; the timer vector is
/// unmasked for the duration but never fires before it is masked again.
#[must_use]
pub fn calibrate_timer<R: Mmio32>(lapic: &LocalApic<R>, io: &impl PortIo) -> Calibration {
    lapic.arm_one_shot_timer();

    let gate = io.inb(PORT_SPEAKER) & GATE_MASK;
    io.outb(PORT_SPEAKER, gate | GATE_ON);

    let [lo, hi] = WINDOW_COUNT.to_le_bytes();
    io.outb(PORT_PIT_COMMAND, CHANNEL2_ONE_SHOT);
    io.outb(PORT_PIT_CHANNEL2, lo);
    io.outb(PORT_PIT_CHANNEL2, hi);

    io.outb(PORT_SPEAKER, gate);
    io.outb(PORT_SPEAKER, gate | GATE_ON);
    lapic.set_initial_count(u32::MAX);

    while io.inb(PORT_SPEAKER) & OUTPUT_HIGH == 0 {
        spin_loop();
    }

    let calibration = Calibration::from_remaining(lapic.stop_timer());
    info!(
        "Bus clock {} kHz, timer reload {}",
        calibration.bus_hz / 1000,
        calibration.reload
    );
    calibration
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_from_remaining_count() {
        // 500 000 local timer counts in 10 ms: a 100 MHz bus.
        let c = Calibration::from_remaining(u32::MAX - 500_000);
        assert_eq!(c.bus_hz, 100_000_000);
        assert_eq!(c.reload, 100_000);
    }

    #[test]
    fn full_count_elapsed_does_not_overflow() {
        let c = Calibration::from_remaining(0);
        assert_eq!(c.bus_hz, u64::from(u32::MAX) * 200);
        assert_eq!(c.reload, u32::try_from(c.bus_hz / TICK_HZ).unwrap());
    }

    #[test]
    fn nothing_elapsed() {
        assert_eq!(
            Calibration::from_remaining(u32::MAX),
            Calibration { bus_hz: 0, reload: 0 }
        );
    }
}
