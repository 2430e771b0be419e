//! # Memory Layout

/// Base of the kernel's window onto low physical memory.
///
/// Physical address `pa` (below [`PHYS_WINDOW_SIZE`]) is visible at
/// `PHYS_WINDOW_BASE + pa`.
pub const PHYS_WINDOW_BASE: u64 = 0xffff_8880_0000_0000;

/// Amount of physical memory covered by the window.
pub const PHYS_WINDOW_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// Where the kernel executes (VMA), matches the linker script.
///
/// # Kernel Build
/// This information is sourced in the kernel's `build.rs` to configure
/// the linker.
pub const KERNEL_BASE: u64 = 0xffff_ffff_8000_0000;

/// Where the kernel image sits in *physical* memory (LMA).
pub const PHYS_LOAD: u64 = 0x0010_0000; // 1 MiB

/// Physical base of the region given to the page allocator at boot.
pub const KERNEL_POOL_PHYS: u64 = 0x0100_0000;

/// Length of the boot page pool.
pub const KERNEL_POOL_LEN: u64 = 0x0020_0000;

/// Physical page the AP trampoline is copied to. The start-up IPI carries
/// its page number, so it must be page aligned and below 1 MiB.
pub const AP_LAUNCH_PHYS: u64 = 0x8000;

/// Local APIC window when firmware does not say otherwise.
pub const LOCAL_APIC_DEFAULT: u64 = 0xFEE0_0000;

/// IO APIC window assumed when firmware describes none.
pub const IO_APIC_DEFAULT: u64 = 0xFEC0_0000;

/// Size of the stack each processor runs its kernel code on.
pub const KERNEL_STACK_SIZE: usize = 32 * 1024;

const _: () = {
    assert!(KERNEL_STACK_SIZE.is_multiple_of(4096));
    assert!(AP_LAUNCH_PHYS.is_multiple_of(4096) && AP_LAUNCH_PHYS < 0x10_0000);
    assert!(KERNEL_POOL_PHYS.is_multiple_of(4096) && KERNEL_POOL_LEN.is_multiple_of(4096));
    assert!(KERNEL_POOL_PHYS >= PHYS_LOAD);
    assert!(KERNEL_POOL_PHYS + KERNEL_POOL_LEN <= PHYS_WINDOW_SIZE);
    assert!(LOCAL_APIC_DEFAULT < PHYS_WINDOW_SIZE && IO_APIC_DEFAULT < PHYS_WINDOW_SIZE);
    assert!(KERNEL_BASE > PHYS_WINDOW_BASE + PHYS_WINDOW_SIZE);
};
