//! # RSDP (Root System Description Pointer)

use core::ops::Range;

use crate::{PhysMapRo, checksum};

/// The last KiB of conventional memory, where the EBDA usually lives.
pub const EBDA_WINDOW: Range<u64> = 0x9_FC00..0xA_0000;

/// The BIOS read-only area below 1 MiB.
pub const BIOS_ROM_WINDOW: Range<u64> = 0xE_0000..0x10_0000;

const SIGNATURE: &[u8; 8] = b"RSD PTR ";
const STRIDE: usize = 16;
const V1_LEN: usize = 20;

/// ACPI 1.0 Root System Description Pointer plus the 2.0 extension.
#[derive(Clone, Copy)]
#[repr(C, packed)]
#[allow(dead_code)]
struct RawRsdp {
    signature: [u8; 8],
    checksum: u8,
    oem_id: [u8; 6],
    revision: u8,
    rsdt_addr: u32,
    length: u32,
    xsdt_addr: u64,
    ext_checksum: u8,
    reserved: [u8; 3],
}

const _: () = assert!(size_of::<RawRsdp>() == 36);

/// A validated root pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootPointer {
    /// Physical address the structure was found at.
    pub address: u64,
    pub revision: u8,
    /// Physical address of the RSDT; may be zero on XSDT-only firmware.
    pub rsdt_addr: u32,
    /// Physical address of the XSDT, for revision 2 and above.
    pub xsdt_addr: Option<u64>,
}

impl RootPointer {
    /// Validate a candidate at `paddr`.
    ///
    /// The first 20 bytes must sum to zero. For revision > 0 the full
    /// 36-byte structure must sum to zero as well.
    ///
    /// # Safety
    /// `map` must be able to map `paddr` for reading.
    #[must_use]
    pub unsafe fn parse(map: &impl PhysMapRo, paddr: u64) -> Option<Self> {
        let v1 = unsafe { map.map_ro(paddr, V1_LEN) };
        if v1.len() < V1_LEN || &v1[..8] != SIGNATURE || checksum(v1) != 0 {
            return None;
        }

        let full = unsafe { map.map_ro(paddr, size_of::<RawRsdp>()) };
        let revision = v1[15];
        if revision > 0 && (full.len() < size_of::<RawRsdp>() || checksum(full) != 0) {
            return None;
        }

        let (rsdt_addr, xsdt_addr) = if full.len() >= size_of::<RawRsdp>() {
            // SAFETY: length checked; the packed struct has alignment 1.
            let raw = unsafe { full.as_ptr().cast::<RawRsdp>().read_unaligned() };
            let xsdt = (raw.revision >= 2 && raw.xsdt_addr != 0).then_some(raw.xsdt_addr);
            (raw.rsdt_addr, xsdt)
        } else {
            (u32::from_le_bytes([v1[16], v1[17], v1[18], v1[19]]), None)
        };

        Some(Self {
            address: paddr,
            revision,
            rsdt_addr,
            xsdt_addr,
        })
    }
}

/// Scan `window` on 16-byte boundaries for the first valid root pointer.
///
/// # Safety
/// `map` must be able to map the whole window for reading.
#[must_use]
pub unsafe fn scan_window(map: &impl PhysMapRo, window: Range<u64>) -> Option<RootPointer> {
    let Ok(len) = usize::try_from(window.end.saturating_sub(window.start)) else {
        return None;
    };
    let bytes = unsafe { map.map_ro(window.start, len) };

    (0..bytes.len())
        .step_by(STRIDE)
        .filter(|&offset| bytes[offset..].starts_with(SIGNATURE))
        .find_map(|offset| unsafe { RootPointer::parse(map, window.start + offset as u64) })
}

/// Search the EBDA window, then the BIOS ROM window.
///
/// # Safety
/// `map` must be able to map both windows for reading.
#[must_use]
pub unsafe fn find_root_pointer(map: &impl PhysMapRo) -> Option<RootPointer> {
    unsafe { scan_window(map, EBDA_WINDOW).or_else(|| scan_window(map, BIOS_ROM_WINDOW)) }
}
