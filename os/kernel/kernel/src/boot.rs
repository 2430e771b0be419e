//! Boot processor and secondary processor entry.

use core::ptr::NonNull;

use kernel_acpi::{find_root_pointer, find_topology_table};
use kernel_alloc::{PageAllocator, PhysWindow};
use kernel_cpu::{
    BringUpState, Cpu, CpuTable, bring_up_all, enumerate, local_apic_base, secondary_entry,
};
use kernel_info::memory::{KERNEL_POOL_LEN, KERNEL_POOL_PHYS};
use kernel_intr::hw::{MmioMapper, MmioRegion};
use kernel_intr::{InterruptController, LocalApic};
use kernel_qemu::{QemuLogger, qemu_trace};
use kernel_sync::SyncOnceCell;
use log::{LevelFilter, info};

use crate::arch::{X86Arch, halt_forever, wait_for_interrupt};
use crate::isr::entry_stubs;
use crate::panic::is_halting;
use crate::phys::{DeviceMap, FirmwareMap};
use crate::policy::KernelPolicy;
use crate::ports::X86Ports;
use crate::trampoline::ApTrampoline;

const BOOT_STACK_SIZE: usize = 64 * 1024;

#[allow(clippy::cast_possible_truncation)]
const POOL_LEN: usize = KERNEL_POOL_LEN as usize;

#[repr(C, align(16))]
struct Aligned<const N: usize>([u8; N]);

#[unsafe(link_section = ".bss.boot")]
static mut BOOT_STACK: Aligned<BOOT_STACK_SIZE> = Aligned([0; BOOT_STACK_SIZE]);

/// Every processor's local APIC, all at the same physical address.
pub static LAPIC: SyncOnceCell<LocalApic<MmioRegion>> = SyncOnceCell::new();

static CPUS: SyncOnceCell<CpuTable> = SyncOnceCell::new();
static INTERRUPTS: SyncOnceCell<InterruptController<DeviceMap>> = SyncOnceCell::new();
static PAGES: PageAllocator = PageAllocator::new();
static BRING_UP: BringUpState = BringUpState::new();

pub static POLICY: KernelPolicy = KernelPolicy::new(current_cpu, cpu_by_apic_id);

fn current_cpu() -> Option<&'static Cpu> {
    CPUS.get()?.current(LAPIC.get()?)
}

fn cpu_by_apic_id(apic_id: u8) -> Option<&'static Cpu> {
    CPUS.get()?.by_apic_id(apic_id)
}

/// The kernel entry point.
///
/// # Loader contract
/// Entered in long mode with interrupts disabled and paging enabled. The
/// page tables map the image at `KERNEL_BASE`, the first 4 GiB of physical
/// memory at `PHYS_WINDOW_BASE` (device windows uncached), and identity-map
/// the trampoline launch page. They stay in use on every processor.
///
/// # Naked function & Stack
/// Nothing is known about the incoming stack, so this switches to
/// [`BOOT_STACK`] before any Rust code runs.
#[unsafe(no_mangle)]
#[unsafe(naked)]
#[unsafe(link_section = ".text.boot")]
pub extern "C" fn _start() {
    core::arch::naked_asm!(
        "cli",
        "lea rax, [rip + {stack_sym}]",
        "add rax, {stack_size}",
        "and rax, -16",
        "mov rsp, rax",
        // Emulate a CALL so RSP % 16 == 8 at entry.
        "push 0",
        "xor ebp, ebp",
        "jmp {rust_entry}",
        stack_sym = sym BOOT_STACK,
        stack_size = const BOOT_STACK_SIZE,
        rust_entry = sym kernel_entry,
    );
}

extern "C" fn kernel_entry() -> ! {
    qemu_trace!("Kernel reporting to QEMU!\n");
    if let Err(err) = QemuLogger::new(LevelFilter::Debug).init() {
        panic!("Logger: {err}");
    }
    kernel_main()
}

fn kernel_main() -> ! {
    let window = PhysWindow::KERNEL;

    let Some(pool) = window.ptr::<u8>(KERNEL_POOL_PHYS).and_then(NonNull::new) else {
        panic!("Page pool at {KERNEL_POOL_PHYS:#x} outside the physical window");
    };
    // SAFETY: the pool region is reserved for the allocator by the memory
    // layout and nothing else references it.
    match unsafe { PAGES.init(pool, POOL_LEN) } {
        Ok(pages) => info!("Page pool: {pages} pages at {KERNEL_POOL_PHYS:#x}"),
        Err(err) => panic!("Page pool: {err}"),
    }

    let firmware = FirmwareMap::new(window);
    // SAFETY: the physical window covers the BIOS areas and firmware tables.
    let root = unsafe { find_root_pointer(&firmware) };
    match &root {
        Some(root) => info!("ACPI root pointer at {:#x} (revision {})", root.address, root.revision),
        None => info!("No ACPI root pointer"),
    }
    // SAFETY: as above.
    let topology = root
        .as_ref()
        .and_then(|root| unsafe { find_topology_table(&firmware, root) });

    // SAFETY: the loader maps the physical window with device windows uncached.
    let devices = unsafe { DeviceMap::new(window) };
    let lapic_base = local_apic_base(topology.as_ref());
    let Some(regs) = devices.map(lapic_base) else {
        panic!("Local APIC at {lapic_base:#x} unreachable");
    };
    let Ok(lapic) = LAPIC.set(LocalApic::new(regs)) else {
        panic!("Local APIC set up twice");
    };

    let mut interrupts = InterruptController::new(devices);
    let mut cpus = CpuTable::new();
    if let Err(err) = enumerate(&mut cpus, topology.as_ref(), lapic, &PAGES, &mut interrupts) {
        panic!("{err}");
    }

    // SAFETY: ring 0, and the boot processor is the only one running.
    let ports = unsafe { X86Ports::new() };
    interrupts.build_vector_table(&entry_stubs(), &ports);

    let (Ok(cpus), Ok(interrupts)) = (CPUS.set(cpus), INTERRUPTS.set(interrupts)) else {
        panic!("Processors enumerated twice");
    };

    // SAFETY: the launch page is reserved by the memory layout and mapped
    // writable through the window.
    let trampoline = unsafe { ApTrampoline::new(window) };
    let bsp = match bring_up_all(
        &BRING_UP,
        cpus,
        lapic,
        &ports,
        &trampoline,
        &X86Arch,
        interrupts.vector_table(),
    ) {
        Ok(cpu) => cpu,
        Err(err) => panic!("{err}"),
    };

    info!(
        "CPU {} (APIC {}): bring-up complete, clock at {} us",
        bsp.id,
        bsp.apic_id,
        POLICY.clock().now()
    );
    idle()
}

/// Entered by every secondary processor from the trampoline, on its own stack.
pub extern "C" fn ap_entry() -> ! {
    let (Some(lapic), Some(cpus), Some(interrupts)) = (LAPIC.get(), CPUS.get(), INTERRUPTS.get())
    else {
        panic!("Secondary processor started before the boot processor finished setup");
    };

    if let Err(err) = secondary_entry(&BRING_UP, cpus, lapic, &X86Arch, interrupts.vector_table()) {
        panic!("{err}");
    }
    idle()
}

fn idle() -> ! {
    loop {
        if is_halting() {
            halt_forever();
        }
        wait_for_interrupt();
    }
}
