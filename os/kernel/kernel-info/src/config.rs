//! # Tunables

/// Periodic timer interrupts per second, per processor.
pub const TICK_HZ: u64 = 1000;

/// Microseconds the system clock advances per tick.
pub const MICROS_PER_TICK: u64 = 1_000_000 / TICK_HZ;

/// Processors addressable through an 8-bit xAPIC id.
pub const MAX_CPUS: usize = 256;

/// Slots in the routing-chip (IO APIC) table.
pub const MAX_ROUTING_CHIPS: usize = 8;

const _: () = {
    assert!(TICK_HZ > 0 && 1_000_000 % TICK_HZ == 0);
    assert!(MAX_CPUS <= 256);
};
