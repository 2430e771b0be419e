//! # Segment descriptors for long mode
//!
//! Every processor gets the same seven-slot table; only the TSS descriptor
//! differs, because it points at that processor's own task-state block.
//!
//! Index | Selector | Meaning
//! ------|----------|--------
//! 0     | 0x00     | Null
//! 1     | 0x08     | Kernel code (64-bit, DPL 0)
//! 2     | 0x10     | Kernel data (DPL 0)
//! 3     | 0x18     | User data (DPL 3)
//! 4     | 0x20     | User code (64-bit, DPL 3)
//! 5/6   | 0x28     | TSS (16-byte system descriptor)
//!
//! Base and limit of code and data segments are ignored in long mode and stay
//! zero.

use bitfield_struct::bitfield;

pub const KERNEL_CODE_SELECTOR: u16 = 0x08;
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;
pub const USER_DATA_SELECTOR: u16 = 0x18 | 3;
pub const USER_CODE_SELECTOR: u16 = 0x20 | 3;
pub const TSS_SELECTOR: u16 = 0x28;

/// Number of 8-byte slots in a processor's table.
pub const GDT_ENTRIES: usize = 7;

/// Byte limit written into the TSS descriptor.
pub const TSS_LIMIT: u16 = 0x68;

/// Bit layout shared by code and data descriptors.
#[bitfield(u64)]
pub struct SegmentDescriptor {
    pub limit_lo: u16, // [15:0]
    pub base_lo: u16,  // [31:16]
    pub base_mid: u8,  // [39:32]
    #[bits(4)]
    pub typ: u8, // [43:40]
    pub s: bool, // [44] code/data
    #[bits(2)]
    pub dpl: u8, // [46:45]
    pub p: bool, // [47]
    #[bits(4)]
    pub limit_hi: u8, // [51:48]
    pub avl: bool,    // [52]
    pub l: bool,      // [53] 64-bit code
    pub db: bool,     // [54]
    pub g: bool,      // [55] 4 KiB granularity
    pub base_hi: u8,  // [63:56]
}

impl SegmentDescriptor {
    /// Execute/read, accessed, `L = 1`.
    #[must_use]
    pub const fn code(dpl: u8) -> Self {
        Self::new()
            .with_typ(0b1011)
            .with_s(true)
            .with_dpl(dpl & 0b11)
            .with_p(true)
            .with_l(true)
            .with_g(true)
    }

    /// Read/write, accessed, `D/B = 1`.
    #[must_use]
    pub const fn data(dpl: u8) -> Self {
        Self::new()
            .with_typ(0b0011)
            .with_s(true)
            .with_dpl(dpl & 0b11)
            .with_p(true)
            .with_db(true)
            .with_g(true)
    }
}

/// Low half of a 64-bit available-TSS system descriptor.
#[bitfield(u64)]
pub struct TssDescriptorLow {
    pub limit_lo: u16, // [15:0]
    pub base_lo: u16,  // [31:16]
    pub base_mid: u8,  // [39:32]
    #[bits(4)]
    pub typ: u8, // [43:40] = 0x9
    pub s: bool, // [44] = 0 (system)
    #[bits(2)]
    pub dpl: u8, // [46:45]
    pub p: bool, // [47]
    #[bits(4)]
    pub limit_hi: u8, // [51:48]
    #[bits(4)]
    __: u8, // [55:52]
    pub base_hi: u8, // [63:56]
}

impl TssDescriptorLow {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn available(base: u64) -> Self {
        Self::new()
            .with_limit_lo(TSS_LIMIT)
            .with_base_lo(base as u16)
            .with_base_mid((base >> 16) as u8)
            .with_typ(0x9)
            .with_p(true)
            .with_base_hi((base >> 24) as u8)
    }
}

/// The full table for a task-state block at linear address `tss_base`.
#[must_use]
pub const fn gdt_entries(tss_base: u64) -> [u64; GDT_ENTRIES] {
    [
        0,
        SegmentDescriptor::code(0).into_bits(),
        SegmentDescriptor::data(0).into_bits(),
        SegmentDescriptor::data(3).into_bits(),
        SegmentDescriptor::code(3).into_bits(),
        TssDescriptorLow::available(tss_base).into_bits(),
        tss_base >> 32,
    ]
}

const _: () = {
    assert!(SegmentDescriptor::code(0).into_bits() == 0x00A0_9B00_0000_0000);
    assert!(SegmentDescriptor::data(0).into_bits() == 0x00C0_9300_0000_0000);
    assert!(SegmentDescriptor::data(3).into_bits() == 0x00C0_F300_0000_0000);
    assert!(SegmentDescriptor::code(3).into_bits() == 0x00A0_FB00_0000_0000);
    assert!(TssDescriptorLow::available(0).into_bits() == 0x0000_8900_0000_0068);

    assert!(KERNEL_CODE_SELECTOR == 1 << 3);
    assert!(KERNEL_DATA_SELECTOR == 2 << 3);
    assert!(TSS_SELECTOR == 5 << 3);
};
