//! # Compact Time Periods
//!
//! L4 passes timeouts and deadlines as 16-bit *time periods*: a tiny
//! floating-point format over microseconds. This crate converts durations to
//! that format and expands periods back against a 64-bit clock sample.
//!
//! ## Encoding
//!
//! ```text
//!  15   14        10  9                 0
//! +---+-------------+--------------------+
//! | 0 |  exponent   |      mantissa      |   relative: base + (m << e)
//! +---+-------------+--------------------+
//!
//!  15   14      11  10  9                0
//! +---+-----------+---+------------------+
//! | 1 | exponent  | c |     mantissa     |   absolute: replaces low bits of base
//! +---+-----------+---+------------------+
//! ```
//!
//! * Durations below 1024 µs are stored verbatim (exponent 0, "denormal").
//! * `0x0400` (exponent 1, mantissa 0) is the reserved *zero* period.
//! * `0x0000` is the reserved *infinite* period; anything of 2^41 µs or more
//!   saturates to it.
//!
//! Encoding rounds toward zero, so an expanded period is never longer than the
//! duration it was made from.
//!
//! ## Clock
//!
//! [`SystemClock`] holds the microsecond clock sample that periods are
//! expanded against. It is advanced by the boot processor's timer tick.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod clock;
mod period;

pub use clock::SystemClock;
pub use period::TimePeriod;
