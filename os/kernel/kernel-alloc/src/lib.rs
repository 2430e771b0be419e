//! # Kernel Page Allocation
//!
//! The most primitive memory resource in the kernel: fixed-size 4 KiB pages
//! handed out from a single pool that every processor shares.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  PageAllocator                      │
//! │    • LIFO free list behind one SpinLock             │
//! │    • allocate / zallocate / free                    │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ links live inside the free pages
//! ┌─────────────────▼───────────────────────────────────┐
//! │                     Page                            │
//! │    • owning handle to one 4 KiB block               │
//! │    • leak_as::<T>() for never-freed records         │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                  PhysWindow                         │
//! │    • physical ↔ kernel-virtual for the low 4 GiB    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Free list
//!
//! The allocator keeps no bookkeeping of its own. The first machine word of
//! every free page holds the address of the next free page, and the lowest
//! page of the pool ends the chain with null:
//!
//! ```text
//! head ──► [page n-2 | next] ──► [page n-3 | next] ──► … ──► [page 0 | null]
//! ```
//!
//! Allocation pops the head, freeing pushes onto it. Both are a couple of
//! loads and stores under the lock.
//!
//! ## Safety Model
//!
//! The only unsafe operation is reading and writing the link word of a page
//! the allocator currently owns. Handing a page back twice, or handing back a
//! page that came from somewhere else, silently corrupts the chain; the
//! owning [`Page`] handle makes both mistakes hard to express.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod page;
mod page_alloc;
mod phys_window;

pub use page::{PAGE_SIZE, Page};
pub use page_alloc::{PageAllocator, PoolError};
pub use phys_window::PhysWindow;
