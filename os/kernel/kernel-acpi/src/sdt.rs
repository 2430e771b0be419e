//! # System Description Tables
//!
//! Every ACPI table after the RSDP starts with the same 36-byte header. The
//! root tables (RSDT, XSDT) are plain arrays of physical addresses following
//! that header.

use log::{debug, warn};

use crate::madt::Madt;
use crate::rsdp::RootPointer;
use crate::{PhysMapRo, checksum};

/// Common header of all system description tables.
#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct SdtHeader {
    pub signature: [u8; 4],
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: [u8; 4],
    pub creator_revision: u32,
}

const HEADER_LEN: usize = size_of::<SdtHeader>();
const _: () = assert!(HEADER_LEN == 36);

/// A table whose signature, length and checksum have been verified.
#[derive(Debug, Clone, Copy)]
pub struct Sdt<'a> {
    bytes: &'a [u8],
}

impl<'a> Sdt<'a> {
    /// Map and verify the table at `paddr`.
    ///
    /// Returns `None` if the address is null, the signature differs, the
    /// declared length is shorter than the header, or the bytes do not sum
    /// to zero.
    ///
    /// # Safety
    /// `map` must be able to map `paddr` for reading.
    #[must_use]
    pub unsafe fn load(map: &impl PhysMapRo, paddr: u64, signature: &[u8; 4]) -> Option<Self> {
        if paddr == 0 {
            return None;
        }

        let head = unsafe { map.map_ro(paddr, HEADER_LEN) };
        if head.len() < HEADER_LEN || &head[..4] != signature {
            return None;
        }

        let length = usize::try_from(u32::from_le_bytes([head[4], head[5], head[6], head[7]])).ok()?;
        if length < HEADER_LEN {
            return None;
        }

        let bytes = unsafe { map.map_ro(paddr, length) };
        if bytes.len() < length || checksum(bytes) != 0 {
            return None;
        }

        Some(Self { bytes })
    }

    /// A copy of the table header.
    #[must_use]
    pub fn header(&self) -> SdtHeader {
        // SAFETY: `load` guarantees at least HEADER_LEN bytes; alignment is 1.
        unsafe { self.bytes.as_ptr().cast::<SdtHeader>().read_unaligned() }
    }

    #[must_use]
    pub fn signature(&self) -> [u8; 4] {
        [self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]]
    }

    /// The bytes following the header.
    #[must_use]
    pub fn body(&self) -> &'a [u8] {
        &self.bytes[HEADER_LEN..]
    }
}

/// The RSDT or XSDT: a list of physical table addresses.
#[derive(Debug, Clone, Copy)]
pub struct RootTable<'a> {
    sdt: Sdt<'a>,
    entry_size: usize,
}

impl<'a> RootTable<'a> {
    /// Verify the RSDT at `paddr` (32-bit entries).
    ///
    /// # Safety
    /// `map` must be able to map `paddr` for reading.
    #[must_use]
    pub unsafe fn rsdt(map: &impl PhysMapRo, paddr: u64) -> Option<Self> {
        let sdt = unsafe { Sdt::load(map, paddr, b"RSDT") }?;
        Some(Self { sdt, entry_size: 4 })
    }

    /// Verify the XSDT at `paddr` (64-bit entries).
    ///
    /// # Safety
    /// `map` must be able to map `paddr` for reading.
    #[must_use]
    pub unsafe fn xsdt(map: &impl PhysMapRo, paddr: u64) -> Option<Self> {
        let sdt = unsafe { Sdt::load(map, paddr, b"XSDT") }?;
        Some(Self { sdt, entry_size: 8 })
    }

    /// Pick the root table named by `root`.
    ///
    /// The RSDT is preferred. The XSDT is used only when the RSDT address is
    /// zero or its table fails validation.
    ///
    /// # Safety
    /// `map` must be able to map the referenced tables for reading.
    #[must_use]
    pub unsafe fn from_root(map: &impl PhysMapRo, root: &RootPointer) -> Option<Self> {
        if let Some(rsdt) = unsafe { Self::rsdt(map, u64::from(root.rsdt_addr)) } {
            return Some(rsdt);
        }

        if root.rsdt_addr != 0 {
            warn!("RSDT at {:#x} failed validation", root.rsdt_addr);
        }

        let xsdt = root.xsdt_addr?;
        unsafe { Self::xsdt(map, xsdt) }
    }

    #[must_use]
    pub fn sdt(&self) -> Sdt<'a> {
        self.sdt
    }

    /// Number of entries; trailing bytes that do not fill an entry are ignored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sdt.body().len() / self.entry_size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physical addresses of the referenced tables.
    pub fn entries(&self) -> impl Iterator<Item = u64> + 'a {
        let entry_size = self.entry_size;
        self.sdt.body().chunks_exact(entry_size).map(move |chunk| {
            let mut raw = [0u8; 8];
            raw[..entry_size].copy_from_slice(chunk);
            u64::from_le_bytes(raw)
        })
    }
}

/// Locate the first valid MADT referenced from the root table.
///
/// Tables that fail their checksum or carry another signature are skipped.
///
/// # Safety
/// `map` must be able to map every referenced table for reading.
#[must_use]
pub unsafe fn find_topology_table<'a>(map: &impl PhysMapRo, root: &RootPointer) -> Option<Madt<'a>> {
    let table = unsafe { RootTable::from_root(map, root) }?;
    debug!(
        "Root table {} with {} entries",
        core::str::from_utf8(&table.sdt().signature()).unwrap_or("????"),
        table.len()
    );

    table.entries().find_map(|paddr| unsafe { Madt::load(map, paddr) })
}
