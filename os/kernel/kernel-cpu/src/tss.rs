//! # 64-bit Task State Segment
//!
//! Long mode no longer switches tasks in hardware, but the CPU still reads
//! the TSS for the ring-0 stack on a privilege change (`rsp0`) and for the
//! interrupt stack table (`ist1..ist7`).

use core::mem::size_of;

/// Hardware layout of the task-state block, 0x68 bytes.
///
/// All `_reserved*` fields must be zero. The I/O permission bitmap offset
/// points past the end of the structure, which disables the bitmap.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct Tss64 {
    _reserved0: u32,

    /// Stack loaded on entry to ring 0 from a less privileged ring.
    pub rsp0: u64,
    pub rsp1: u64,
    pub rsp2: u64,

    _reserved1: u64,

    /// Interrupt stack table; index 0 here is IST1.
    pub ist: [u64; 7],

    _reserved2: u64,
    _reserved3: u16,

    pub iopb_offset: u16,
}

const _: () = assert!(size_of::<Tss64>() == 0x68);

impl Default for Tss64 {
    fn default() -> Self {
        Self::new()
    }
}

impl Tss64 {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new() -> Self {
        Self {
            _reserved0: 0,
            rsp0: 0,
            rsp1: 0,
            rsp2: 0,
            _reserved1: 0,
            ist: [0; 7],
            _reserved2: 0,
            _reserved3: 0,
            iopb_offset: size_of::<Self>() as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_offsets() {
        assert_eq!(core::mem::offset_of!(Tss64, rsp0), 0x04);
        assert_eq!(core::mem::offset_of!(Tss64, ist), 0x24);
        assert_eq!(core::mem::offset_of!(Tss64, iopb_offset), 0x66);
        assert_eq!({ Tss64::new().iopb_offset }, 0x68);
    }
}
