use kernel_info::memory;
use std::{env, path::PathBuf};

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let ld = manifest_dir.join("kernel.ld");

    println!("cargo:rerun-if-changed={}", ld.display());

    // Host builds only compile the stub `main`.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("none") {
        return;
    }

    let kernel_base = memory::KERNEL_BASE;
    let phys_load = memory::PHYS_LOAD;
    assert_eq!(
        kernel_base & ((1u64 << 21) - 1),
        0,
        "KERNEL_BASE must be 2 MiB aligned (got {kernel_base:#x})"
    );
    assert_eq!(
        phys_load & 0xfff,
        0,
        "PHYS_LOAD must be 4 KiB aligned (got {phys_load:#x})"
    );

    println!("cargo:rustc-link-arg-bins=-T{}", ld.display());
    println!("cargo:rustc-link-arg-bins=--defsym=KERNEL_BASE={kernel_base:#x}");
    println!("cargo:rustc-link-arg-bins=--defsym=PHYS_LOAD={phys_load:#x}");
    println!(
        "cargo:rustc-link-arg-bins=--defsym=KERNEL_POOL_PHYS={:#x}",
        memory::KERNEL_POOL_PHYS
    );
}
