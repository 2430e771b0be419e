/// A 16-bit L4 time period. See the crate docs for the bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TimePeriod(u16);

impl TimePeriod {
    /// A period of zero microseconds.
    pub const ZERO: Self = Self(0x0400);

    /// A period that never elapses.
    pub const INFINITE: Self = Self(0);

    const MANTISSA: u16 = 0x03FF;
    const ABSOLUTE: u16 = 0x8000;
    const CARRY: u16 = 0x0400;

    /// Largest `floor(log2(us))` that is still representable.
    const MAX_LOG2: u32 = 40;

    /// Mantissa width; values below `1 << MANTISSA_BITS` are denormal.
    const MANTISSA_BITS: u32 = 10;

    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn into_raw(self) -> u16 {
        self.0
    }

    /// Whether this is an absolute clock value rather than a duration.
    #[must_use]
    pub const fn is_absolute(self) -> bool {
        self.0 & Self::ABSOLUTE != 0
    }

    #[must_use]
    pub const fn mantissa(self) -> u16 {
        self.0 & Self::MANTISSA
    }

    /// Encode a duration, rounding toward zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_micros(us: u64) -> Self {
        if us == 0 {
            return Self::ZERO;
        }

        let log2 = 63 - us.leading_zeros();
        if log2 < Self::MANTISSA_BITS {
            Self(us as u16)
        } else if log2 > Self::MAX_LOG2 {
            Self::INFINITE
        } else {
            // Keep the top ten bits; the leading one stays in the mantissa.
            let shift = log2 - (Self::MANTISSA_BITS - 1);
            Self(((shift << Self::MANTISSA_BITS) as u16) | (us >> shift) as u16)
        }
    }

    /// `base + (mantissa << exponent)`, wrapping like the clock does.
    #[must_use]
    pub const fn expand_relative(self, base: u64) -> u64 {
        let mantissa = (self.0 & Self::MANTISSA) as u64;
        base.wrapping_add(mantissa << (self.0 >> Self::MANTISSA_BITS))
    }

    /// Replace the low-order bits of `base` with this period's mantissa at the
    /// period's exponent.
    ///
    /// When the stored carry flag disagrees with bit 10 of `base >> exponent`
    /// the clock is assumed to have crossed a mantissa boundary since the
    /// period was made, and one more `0x400` step is added before shifting
    /// back. Both additions wrap like the clock does.
    #[must_use]
    pub const fn expand_absolute(self, base: u64) -> u64 {
        let mantissa = (self.0 & Self::MANTISSA) as u64;
        let carry = self.0 & Self::CARRY != 0;
        let exponent = (self.0 & !Self::ABSOLUTE) >> 11;

        let shifted = base >> exponent;
        let mut unshifted = mantissa.wrapping_add(shifted & !0x3FF);
        if carry != (shifted & 0x400 != 0) {
            unshifted = unshifted.wrapping_add(0x400);
        }
        unshifted << exponent
    }

    /// Expand against `base`, picking the form from the top bit.
    #[must_use]
    pub const fn expand(self, base: u64) -> u64 {
        if self.is_absolute() {
            self.expand_absolute(base)
        } else {
            self.expand_relative(base)
        }
    }
}

impl From<u16> for TimePeriod {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<TimePeriod> for u16 {
    fn from(period: TimePeriod) -> Self {
        period.0
    }
}
