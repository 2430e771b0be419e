#![allow(dead_code)]

use std::alloc::{Layout, alloc_zeroed};
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use kernel_acpi::{Madt, PhysMapRo, checksum};
use kernel_alloc::{PAGE_SIZE, PageAllocator};
use kernel_intr::hw::{Mmio32, MmioMapper, PortIo};
use kernel_intr::{DescriptorPointer, EntryStubs, VectorTable};
use kernel_cpu::{CpuArch, Trampoline};

/// A pool with `pages - 1` allocatable pages, living for the whole test binary.
pub fn page_pool(pages: usize) -> &'static PageAllocator {
    let len = pages * PAGE_SIZE;
    let layout = Layout::from_size_align(len, PAGE_SIZE).unwrap();
    let base = NonNull::new(unsafe { alloc_zeroed(layout) }).unwrap();
    let pool = Box::leak(Box::new(PageAllocator::new()));
    unsafe { pool.init(base, len) }.unwrap();
    pool
}

pub fn vector_table() -> &'static VectorTable {
    let table = Box::leak(Box::new(VectorTable::new()));
    table.build(&EntryStubs {
        exceptions: [0xFFFF_FFFF_8000_1000; 15],
        spurious: 0xFFFF_FFFF_8000_2000,
        timer: 0xFFFF_FFFF_8000_3000,
        irq: 0xFFFF_FFFF_8000_4000,
    });
    table
}

/// Firmware memory holding a single MADT at address 0.
pub struct Firmware(Vec<u8>);

impl Firmware {
    pub fn with_madt(lapic: u32, entries: &[Vec<u8>]) -> Self {
        let mut body = Vec::new();
        body.extend_from_slice(&lapic.to_le_bytes());
        body.extend_from_slice(&1u32.to_le_bytes());
        for entry in entries {
            body.extend_from_slice(entry);
        }

        let len = 36 + body.len();
        let mut table = vec![0; len];
        table[..4].copy_from_slice(b"APIC");
        table[4..8].copy_from_slice(&u32::try_from(len).unwrap().to_le_bytes());
        table[8] = 3;
        table[36..].copy_from_slice(&body);
        table[9] = 0u8.wrapping_sub(checksum(&table));
        Self(table)
    }

    pub fn madt(&self) -> Madt<'_> {
        unsafe { Madt::load(self, 0) }.expect("valid MADT")
    }
}

impl PhysMapRo for Firmware {
    unsafe fn map_ro<'a>(&self, paddr: u64, len: usize) -> &'a [u8] {
        let start = usize::try_from(paddr).unwrap().min(self.0.len());
        let end = start.saturating_add(len).min(self.0.len());
        unsafe { core::slice::from_raw_parts(self.0.as_ptr().add(start), end - start) }
    }
}

pub fn local_apic(processor: u8, apic: u8, enabled: bool) -> Vec<u8> {
    let mut e = vec![0, 8, processor, apic];
    e.extend_from_slice(&u32::from(enabled).to_le_bytes());
    e
}

pub fn io_apic(id: u8, address: u32, gsi_base: u32) -> Vec<u8> {
    let mut e = vec![1, 12, id, 0];
    e.extend_from_slice(&address.to_le_bytes());
    e.extend_from_slice(&gsi_base.to_le_bytes());
    e
}

pub fn interrupt_override(source: u8, gsi: u32, flags: u16) -> Vec<u8> {
    let mut e = vec![2, 10, 0, source];
    e.extend_from_slice(&gsi.to_le_bytes());
    e.extend_from_slice(&flags.to_le_bytes());
    e
}

/// An IO APIC behind IOREGSEL/IOWIN with 24 lines.
pub struct FakeIoApic {
    select: AtomicU32,
    regs: Mutex<Vec<u32>>,
}

impl Default for FakeIoApic {
    fn default() -> Self {
        let mut regs = vec![0; 0x10 + 48];
        regs[1] = (23 << 16) | 0x20;
        Self {
            select: AtomicU32::new(0),
            regs: Mutex::new(regs),
        }
    }
}

impl FakeIoApic {
    /// Low dword of redirection entry `line`.
    pub fn low(&self, line: usize) -> u32 {
        self.regs.lock().unwrap()[0x10 + 2 * line]
    }

    pub fn high(&self, line: usize) -> u32 {
        self.regs.lock().unwrap()[0x11 + 2 * line]
    }
}

impl Mmio32 for FakeIoApic {
    fn read32(&self, offset: usize) -> u32 {
        let reg = self.select.load(Ordering::Relaxed) as usize;
        match offset {
            0x00 => reg as u32,
            0x10 => self.regs.lock().unwrap()[reg],
            _ => panic!("IO APIC offset {offset:#x}"),
        }
    }

    fn write32(&self, offset: usize, value: u32) {
        match offset {
            0x00 => self.select.store(value, Ordering::Relaxed),
            0x10 => {
                let reg = self.select.load(Ordering::Relaxed) as usize;
                self.regs.lock().unwrap()[reg] = value;
            }
            _ => panic!("IO APIC offset {offset:#x}"),
        }
    }
}

/// Routing chips by physical address.
pub struct Bus<'a>(pub Vec<(u64, &'a FakeIoApic)>);

impl<'a> MmioMapper for Bus<'a> {
    type Region = &'a FakeIoApic;

    fn map(&self, phys: u64) -> Option<&'a FakeIoApic> {
        self.0.iter().find(|(at, _)| *at == phys).map(|(_, c)| *c)
    }
}

/// Every IPI sent, as `(destination APIC id, ICR low)`.
pub type IpiLog = Arc<Mutex<Vec<(u8, u32)>>>;

/// One processor's view of its local APIC.
pub struct FakeLapic {
    id: u8,
    remaining: u32,
    values: Mutex<HashMap<usize, u32>>,
    writes: Mutex<Vec<(usize, u32)>>,
    ipis: IpiLog,
}

impl FakeLapic {
    pub fn new(id: u8, ipis: IpiLog) -> Self {
        Self::with_remaining(id, ipis, u32::MAX - 500_000)
    }

    /// The timer current-count register reads `remaining`.
    pub fn with_remaining(id: u8, ipis: IpiLog, remaining: u32) -> Self {
        Self {
            id,
            remaining,
            values: Mutex::default(),
            writes: Mutex::default(),
            ipis,
        }
    }

    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.writes.lock().unwrap().clone()
    }
}

impl Mmio32 for FakeLapic {
    fn read32(&self, offset: usize) -> u32 {
        match offset {
            0x020 => u32::from(self.id) << 24,
            0x390 => self.remaining,
            _ => self.values.lock().unwrap().get(&offset).copied().unwrap_or(0),
        }
    }

    fn write32(&self, offset: usize, value: u32) {
        self.writes.lock().unwrap().push((offset, value));
        if offset == 0x300 {
            let dest = self.values.lock().unwrap().get(&0x310).copied().unwrap_or(0) >> 24;
            self.ipis
                .lock()
                .unwrap()
                .push((u8::try_from(dest).unwrap(), value));
        } else {
            self.values.lock().unwrap().insert(offset, value);
        }
    }
}

/// Port 0x61 whose PIT output bit goes high after `polls` status reads.
pub struct FakePit {
    speaker: Mutex<u8>,
    polls: AtomicU32,
    pub writes: Mutex<Vec<(u16, u8)>>,
}

impl FakePit {
    pub fn new(polls: u32) -> Self {
        Self {
            speaker: Mutex::new(0x4F),
            polls: AtomicU32::new(polls),
            writes: Mutex::default(),
        }
    }
}

impl PortIo for FakePit {
    fn inb(&self, port: u16) -> u8 {
        assert_eq!(port, 0x61);
        let value = *self.speaker.lock().unwrap();
        let expired = self
            .polls
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_err();
        if expired { value | 0x20 } else { value }
    }

    fn outb(&self, port: u16, value: u8) {
        if port == 0x61 {
            *self.speaker.lock().unwrap() = value;
        }
        self.writes.lock().unwrap().push((port, value));
    }
}

/// Records every table load as `(gdt base, gdt limit, idt base)`.
#[derive(Default)]
pub struct FakeArch(pub Mutex<Vec<(u64, u16, u64)>>);

impl CpuArch for FakeArch {
    fn load_tables(&self, gdt: DescriptorPointer, idt: DescriptorPointer) {
        assert_eq!({ idt.limit }, 4095);
        self.0.lock().unwrap().push((gdt.base, gdt.limit, idt.base));
    }
}

/// Records installs together with the IPIs sent before each one.
pub struct FakeTrampoline {
    pub ipis: IpiLog,
    pub installs: Mutex<Vec<(u64, usize)>>,
}

impl FakeTrampoline {
    pub fn new(ipis: IpiLog) -> Self {
        Self {
            ipis,
            installs: Mutex::default(),
        }
    }
}

impl Trampoline for FakeTrampoline {
    fn install(&self, launch_phys: u64) {
        let sent = self.ipis.lock().unwrap().len();
        self.installs.lock().unwrap().push((launch_phys, sent));
    }
}
