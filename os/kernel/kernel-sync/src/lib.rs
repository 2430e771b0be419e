//! # Kernel synchronization primitives
//!
//! Busy-waiting building blocks for code that runs before any scheduler
//! exists. Nothing here ever yields; "blocking" always means spinning with a
//! [`spin_loop`](core::hint::spin_loop) hint.
//!
//! * [`SpinLock`]: test-and-test-and-set mutual exclusion with an RAII guard.
//!   Not reentrant.
//! * [`SyncOnceCell`]: a construct-once slot for process-wide registries that
//!   become read-only after boot.
//! * [`ArrivalCounter`]: a fetch-and-add counter that one processor can spin
//!   on until a given number of participants have checked in.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod arrival;
mod spin_lock;
mod sync_once_cell;

pub use arrival::ArrivalCounter;
pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
