use crate::hw::{MmioMapper, PortIo};
use crate::idt::{EntryStubs, VectorTable};
use crate::ioapic::{RoutingChipError, RoutingChips};
use crate::pic::disable_legacy_pic;

/// Owner of the shared vector table and the routing-chip registry.
///
/// Mutated only by the boot processor before any other processor starts;
/// read-only afterwards.
pub struct InterruptController<M: MmioMapper> {
    vectors: VectorTable,
    chips: RoutingChips<M>,
}

impl<M: MmioMapper> InterruptController<M> {
    #[must_use]
    pub const fn new(mapper: M) -> Self {
        Self {
            vectors: VectorTable::new(),
            chips: RoutingChips::new(mapper),
        }
    }

    /// Fill the vector table from `stubs` and silence the legacy PIC.
    pub fn build_vector_table(&mut self, stubs: &EntryStubs, io: &impl PortIo) {
        self.vectors.build(stubs);
        disable_legacy_pic(io);
    }

    /// See [`RoutingChips::register`].
    ///
    /// # Errors
    /// Propagates [`RoutingChipError`].
    pub fn register_routing_chip(
        &mut self,
        address: u64,
        base_irq: u32,
        bsp_apic_id: u8,
    ) -> Result<usize, RoutingChipError> {
        self.chips.register(address, base_irq, bsp_apic_id)
    }

    /// See [`RoutingChips::apply_isa_override`].
    pub fn apply_isa_override(&mut self, isa_irq: u8, routed_irq: u32, flags: u16) -> bool {
        self.chips.apply_isa_override(isa_irq, routed_irq, flags)
    }

    #[must_use]
    pub const fn vector_table(&self) -> &VectorTable {
        &self.vectors
    }

    #[must_use]
    pub const fn routing_chips(&self) -> &RoutingChips<M> {
        &self.chips
    }
}
