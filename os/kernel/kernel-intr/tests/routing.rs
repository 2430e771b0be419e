use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use kernel_intr::hw::{Mmio32, MmioMapper, PortIo};
use kernel_intr::{EntryStubs, InterruptController, RedirectionEntry, RoutingChipError};

/// An IO APIC behind IOREGSEL/IOWIN.
struct FakeIoApic {
    select: AtomicU32,
    regs: Mutex<Vec<u32>>,
}

impl FakeIoApic {
    fn new(id: u32, lines: u32) -> Self {
        let mut regs = vec![0; 0x10 + 2 * lines as usize];
        regs[0] = id << 24;
        regs[1] = ((lines - 1) << 16) | 0x20;
        Self {
            select: AtomicU32::new(0),
            regs: Mutex::new(regs),
        }
    }

    /// Every register that responds with all ones.
    fn floating() -> Self {
        let apic = Self::new(0, 1);
        apic.regs.lock().unwrap().fill(0xFFFF_FFFF);
        apic
    }

    fn entry(&self, line: usize) -> RedirectionEntry {
        let regs = self.regs.lock().unwrap();
        RedirectionEntry::from_halves(regs[0x10 + 2 * line], regs[0x11 + 2 * line])
    }

    fn snapshot(&self) -> Vec<u32> {
        self.regs.lock().unwrap().clone()
    }
}

impl Mmio32 for FakeIoApic {
    fn read32(&self, offset: usize) -> u32 {
        match offset {
            0x00 => self.select.load(Ordering::Relaxed),
            0x10 => {
                let reg = self.select.load(Ordering::Relaxed) as usize;
                self.regs.lock().unwrap()[reg]
            }
            _ => panic!("read of unknown IO APIC offset {offset:#x}"),
        }
    }

    fn write32(&self, offset: usize, value: u32) {
        match offset {
            0x00 => self.select.store(value, Ordering::Relaxed),
            0x10 => {
                let reg = self.select.load(Ordering::Relaxed) as usize;
                assert!(reg >= 0x10, "write to read-only IO APIC register {reg:#x}");
                self.regs.lock().unwrap()[reg] = value;
            }
            _ => panic!("write of unknown IO APIC offset {offset:#x}"),
        }
    }
}

struct Bus<'a>(Vec<(u64, &'a FakeIoApic)>);

impl<'a> MmioMapper for Bus<'a> {
    type Region = &'a FakeIoApic;

    fn map(&self, phys: u64) -> Option<&'a FakeIoApic> {
        self.0.iter().find(|(at, _)| *at == phys).map(|(_, chip)| *chip)
    }
}

#[derive(Default)]
struct Ports(Mutex<Vec<(u16, u8)>>);

impl PortIo for Ports {
    fn inb(&self, _port: u16) -> u8 {
        0
    }

    fn outb(&self, port: u16, value: u8) {
        self.0.lock().unwrap().push((port, value));
    }
}

#[test]
fn registered_lines_start_masked_edge_high_on_bsp() {
    let chip = FakeIoApic::new(2, 24);
    let mut ctl = InterruptController::new(Bus(vec![(0xFEC0_0000, &chip)]));

    assert_eq!(ctl.register_routing_chip(0xFEC0_0000, 0, 3), Ok(0));

    for line in 0..24 {
        let e = chip.entry(line);
        assert_eq!(usize::from(e.vector()), 0x30 + line);
        assert!(e.masked());
        assert!(!e.level_triggered());
        assert!(!e.active_low());
        assert!(!e.dest_logical());
        assert_eq!(e.delivery_mode(), 0);
        assert_eq!(e.destination(), 3);
    }

    let chips: Vec<_> = ctl.routing_chips().chips().copied().collect();
    assert_eq!(chips.len(), 1);
    assert_eq!(chips[0].base_irq, 0);
    assert_eq!(chips[0].count, 24);
}

#[test]
fn vectors_follow_the_base_irq_and_wrap() {
    let chip = FakeIoApic::new(1, 24);
    let mut ctl = InterruptController::new(Bus(vec![(0xFEC1_0000, &chip)]));
    ctl.register_routing_chip(0xFEC1_0000, 200, 0).unwrap();

    assert_eq!(chip.entry(0).vector(), 0xF8);
    assert_eq!(chip.entry(7).vector(), 0xFF);
    assert_eq!(chip.entry(8).vector(), 0x00);
}

#[test]
fn null_address_is_rejected() {
    let mut ctl = InterruptController::new(Bus(vec![]));
    assert_eq!(
        ctl.register_routing_chip(0, 0, 0),
        Err(RoutingChipError::NullAddress)
    );
    assert!(ctl.routing_chips().is_empty());
}

#[test]
fn identical_id_and_version_is_a_probe_failure() {
    let chip = FakeIoApic::floating();
    let mut ctl = InterruptController::new(Bus(vec![(0xFEC0_0000, &chip)]));
    assert_eq!(
        ctl.register_routing_chip(0xFEC0_0000, 0, 0),
        Err(RoutingChipError::ProbeFailed { id: 0xFFFF_FFFF })
    );
}

#[test]
fn ninth_chip_does_not_fit() {
    let chips: Vec<FakeIoApic> = (0..9).map(|i| FakeIoApic::new(i, 4)).collect();
    let bus = Bus(
        chips
            .iter()
            .enumerate()
            .map(|(i, c)| (0xFEC0_0000 + 0x1000 * i as u64, c))
            .collect(),
    );
    let mut ctl = InterruptController::new(bus);

    for i in 0..8u32 {
        let addr = 0xFEC0_0000 + 0x1000 * u64::from(i);
        assert_eq!(ctl.register_routing_chip(addr, i * 4, 0), Ok(i as usize));
    }
    assert_eq!(
        ctl.register_routing_chip(0xFEC0_8000, 32, 0),
        Err(RoutingChipError::TableFull)
    );
    assert_eq!(ctl.routing_chips().len(), 8);
}

#[test]
fn override_changes_exactly_one_low_byte() {
    let chip = FakeIoApic::new(0, 24);
    let mut ctl = InterruptController::new(Bus(vec![(0xFEC0_0000, &chip)]));
    ctl.register_routing_chip(0xFEC0_0000, 0, 0).unwrap();
    let before = chip.snapshot();

    assert!(ctl.apply_isa_override(0, 2, 0));

    let after = chip.snapshot();
    let changed: Vec<usize> = (0..before.len()).filter(|&r| before[r] != after[r]).collect();
    assert_eq!(changed, vec![0x10]);
    assert_eq!(before[0x10] & !0xFF, after[0x10] & !0xFF);
    assert_eq!(after[0x10] & 0xFF, 0x32);
}

#[test]
fn override_flags_select_polarity_and_trigger() {
    let chip = FakeIoApic::new(0, 24);
    let mut ctl = InterruptController::new(Bus(vec![(0xFEC0_0000, &chip)]));
    ctl.register_routing_chip(0xFEC0_0000, 0, 0).unwrap();

    ctl.apply_isa_override(9, 9, 0b1111);
    let sci = chip.entry(9);
    assert!(sci.active_low());
    assert!(sci.level_triggered());
    assert!(sci.masked());

    ctl.apply_isa_override(5, 5, 0b0111);
    assert!(chip.entry(5).active_low());
    assert!(!chip.entry(5).level_triggered());

    ctl.apply_isa_override(6, 6, 0b1101);
    assert!(!chip.entry(6).active_low());
    assert!(chip.entry(6).level_triggered());

    // "Conforms to bus" (0b00) and active high (0b01) both leave the line high.
    ctl.apply_isa_override(9, 9, 0b0101);
    assert!(!chip.entry(9).active_low());
    assert!(!chip.entry(9).level_triggered());
}

#[test]
fn override_lands_on_the_owning_chip() {
    let low = FakeIoApic::new(0, 8);
    let high = FakeIoApic::new(1, 8);
    let mut ctl = InterruptController::new(Bus(vec![(0x1000, &low), (0x2000, &high)]));
    ctl.register_routing_chip(0x1000, 0, 0).unwrap();
    ctl.register_routing_chip(0x2000, 8, 0).unwrap();
    let low_before = low.snapshot();

    assert!(ctl.apply_isa_override(10, 14, 0));
    assert_eq!(low.snapshot(), low_before);
    assert_eq!(high.entry(2).vector(), 0x30 + 14);

    let via_registry = ctl.routing_chips().entry(1, 2).unwrap();
    assert_eq!(via_registry, high.entry(2));
}

#[test]
fn override_for_unowned_line_is_dropped() {
    let chip = FakeIoApic::new(0, 4);
    let mut ctl = InterruptController::new(Bus(vec![(0xFEC0_0000, &chip)]));
    ctl.register_routing_chip(0xFEC0_0000, 0, 0).unwrap();
    let before = chip.snapshot();

    assert!(!ctl.apply_isa_override(12, 12, 0b1111));
    assert_eq!(chip.snapshot(), before);
}

#[test]
fn building_the_table_masks_the_legacy_pic() {
    let ports = Ports::default();
    let mut ctl = InterruptController::new(Bus(vec![]));
    let stubs = EntryStubs {
        exceptions: [0x1000; 15],
        spurious: 0x2000,
        timer: 0x3000,
        irq: 0x4000,
    };

    ctl.build_vector_table(&stubs, &ports);

    assert_eq!(*ports.0.lock().unwrap(), vec![(0x21, 0xFF), (0xA1, 0xFF)]);
    assert_eq!(ctl.vector_table()[0x80].handler(), 0x4000);
    assert!(!ctl.vector_table()[0x2F].is_present());
}
