//! # Kernel Configuration
//!
//! Compile-time constants shared by the kernel image, its build script and
//! every core crate. There is no runtime configuration: the kernel runs before
//! files, command lines or environment variables mean anything.
//!
//! ## Modules
//!
//! ### Tunables ([`config`])
//! * **Tick rate**: frequency of the per-processor periodic timer
//! * **Table capacities**: processor and routing-chip limits
//!
//! ### Memory Layout ([`memory`])
//! * **Physical window**: where the first 4 GiB of physical memory is visible
//! * **Kernel pool**: the region handed to the page allocator at boot
//! * **Fixed hardware addresses**: trampoline launch page, default interrupt
//!   controller windows
//!
//! ## Virtual Memory Layout
//!
//! ```text
//! 0x0000_0000_0000_0000 ┌─────────────────────────────────┐
//!                       │   (identity map during boot)    │
//! PHYS_WINDOW_BASE      ├─────────────────────────────────┤ 0xffff_8880_0000_0000
//!                       │   Physical window (4 GiB)       │
//!                       ├─────────────────────────────────┤
//!                       │          unmapped               │
//! KERNEL_BASE           ├─────────────────────────────────┤ 0xffff_ffff_8000_0000
//!                       │     Kernel text & data          │
//! 0xFFFF_FFFF_FFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! ## Physical Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  BIOS data, real-mode IVT       │
//! AP_LAUNCH   ├─────────────────────────────────┤ 0x0000_8000
//!             │  AP trampoline (one page)       │
//!             ├─────────────────────────────────┤
//!             │  EBDA / VGA / BIOS ROM          │
//! PHYS_LOAD   ├─────────────────────────────────┤ 0x0010_0000 (1 MiB)
//!             │  Kernel image and stacks        │
//! POOL        ├─────────────────────────────────┤ 0x0100_0000 (16 MiB)
//!             │  Kernel page pool (2 MiB)       │
//!             └─────────────────────────────────┘
//! ```
//!
//! The layout is checked by `const` assertions in [`memory`]; the kernel's
//! `build.rs` re-checks the linker-relevant values.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod memory;
