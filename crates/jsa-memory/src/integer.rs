//! Decimal formatting of integers straight into an output region.

/// Integers that can be written as ASCII decimal without allocating.
pub trait DecimalInteger: Copy {
    /// Longest possible decimal rendering, including a leading `-`.
    const MAX_DECIMAL_LEN: usize;

    /// Write `self` at the start of `out` and return the number of bytes
    /// written. `out` must hold at least [`Self::MAX_DECIMAL_LEN`] bytes.
    fn write_decimal(self, out: &mut [u8]) -> usize;
}

const fn decimal_digits(mut value: u128) -> usize {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl DecimalInteger for $t {
            const MAX_DECIMAL_LEN: usize = decimal_digits(<$t>::MAX as u128);

            fn write_decimal(self, out: &mut [u8]) -> usize {
                let mut value = self;
                let mut len = 0;
                loop {
                    out[len] = b'0' + (value % 10) as u8;
                    len += 1;
                    value /= 10;
                    if value == 0 {
                        break;
                    }
                }
                out[..len].reverse();
                len
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($t:ty),*) => {$(
        impl DecimalInteger for $t {
            const MAX_DECIMAL_LEN: usize = decimal_digits(<$t>::MAX as u128) + 1;

            fn write_decimal(self, out: &mut [u8]) -> usize {
                if self < 0 {
                    out[0] = b'-';
                    1 + self.unsigned_abs().write_decimal(&mut out[1..])
                } else {
                    self.unsigned_abs().write_decimal(out)
                }
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64, u128, usize);
impl_signed!(i8, i16, i32, i64, i128, isize);
