use kernel_info::config::MAX_CPUS;
use kernel_intr::LocalApic;
use kernel_intr::hw::Mmio32;

use crate::cpu::Cpu;

/// Every registered processor, by logical id and by local APIC id.
///
/// Logical ids are dense and assigned in registration order. The APIC-id
/// lookup covers the full 8-bit xAPIC id space.
pub struct CpuTable {
    cpus: [Option<&'static Cpu>; MAX_CPUS],
    by_apic: [Option<&'static Cpu>; 256],
    len: usize,
}

impl Default for CpuTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cpus: [None; MAX_CPUS],
            by_apic: [None; 256],
            len: 0,
        }
    }

    /// Logical id the next registered processor will get, or `None` when the
    /// table is full.
    #[must_use]
    pub const fn next_id(&self) -> Option<usize> {
        if self.len < MAX_CPUS {
            Some(self.len)
        } else {
            None
        }
    }

    /// Append `cpu`, whose `id` must be [`next_id`](Self::next_id).
    ///
    /// # Panics
    /// If the record's id is out of sequence.
    pub fn push(&mut self, cpu: &'static Cpu) {
        assert_eq!(Some(cpu.id), self.next_id(), "logical ids must be dense");
        self.cpus[self.len] = Some(cpu);
        self.by_apic[usize::from(cpu.apic_id)] = Some(cpu);
        self.len += 1;
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<&'static Cpu> {
        self.cpus.get(id).copied().flatten()
    }

    #[must_use]
    pub fn by_apic_id(&self, apic_id: u8) -> Option<&'static Cpu> {
        self.by_apic[usize::from(apic_id)]
    }

    /// The processor executing this call.
    #[must_use]
    pub fn current<R: Mmio32>(&self, lapic: &LocalApic<R>) -> Option<&'static Cpu> {
        self.by_apic_id(lapic.id())
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Cpu> + '_ {
        self.cpus[..self.len].iter().flatten().copied()
    }
}
