//! The legacy 8259 pair is never used; its lines are masked so it cannot
//! deliver stray vectors once interrupts are enabled.

use crate::hw::PortIo;

const MASTER_DATA: u16 = 0x21;
const SLAVE_DATA: u16 = 0xA1;

/// Mask every line on both legacy controllers.
pub fn disable_legacy_pic(io: &impl PortIo) {
    io.outb(MASTER_DATA, 0xFF);
    io.outb(SLAVE_DATA, 0xFF);
}
