//! # Kernel Entry Point
//!
//! The bare-metal image. Everything with an opinion lives in the library
//! crates; this binary supplies what they abstract over and wires them up.
//!
//! ```text
//! _start ──► kernel_entry ──► kernel_main
//!                                 │ logger, page pool
//!                                 │ ACPI: root pointer, MADT
//!                                 │ enumerate processors and IO APICs
//!                                 │ vector table, legacy PIC off
//!                                 │ bring_up_all ───────► trampoline ──► ap_entry
//!                                 ▼                                        ▼
//!                               idle ◄───────────────── late_init ◄──── secondary_entry
//! ```
//!
//! | module       | provides                                         |
//! |--------------|--------------------------------------------------|
//! | `boot`       | entry points, boot stack, the shared statics     |
//! | `ports`      | `in`/`out` as [`kernel_intr::hw::PortIo`]        |
//! | `phys`       | firmware and device memory through the window    |
//! | `arch`       | `lgdt`/`ltr`/`lidt`, control registers, `hlt`    |
//! | `isr`        | entry stubs feeding `kernel_intr::handle`        |
//! | `policy`     | user exceptions, `#NM`, timer ticks, IRQ counts  |
//! | `trampoline` | real-mode start-up code for secondary processors |
//! | `panic`      | `Kernel Panic: ...`, then every processor halts  |
//!
//! Only `x86_64-unknown-none` builds the real image. Other targets get an
//! empty `main` so the workspace still builds and tests on the host.

#![cfg_attr(target_os = "none", no_std, no_main)]
#![allow(unsafe_code)]

#[cfg(target_os = "none")]
mod arch;
#[cfg(target_os = "none")]
mod boot;
#[cfg(target_os = "none")]
mod isr;
#[cfg(target_os = "none")]
mod panic;
#[cfg(target_os = "none")]
mod phys;
#[cfg(target_os = "none")]
mod policy;
#[cfg(target_os = "none")]
mod ports;
#[cfg(target_os = "none")]
mod trampoline;

#[cfg(not(target_os = "none"))]
fn main() {}
