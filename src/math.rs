// ============================================================================
// Wide Integer Helpers
// ============================================================================
//
// Reward shares multiply a pool amount by a trader volume before dividing by
// the market volume. Volumes are u128 notionals (18-decimal amounts are
// common), so the product can exceed u128. These helpers keep the full
// 256-bit intermediate and only fail when the final quotient does not fit.

const LO_MASK: u128 = u64::MAX as u128;

/// Full 256-bit product of `a * b`, returned as `(hi, lo)`.
#[inline]
pub fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    let (a_hi, a_lo) = (a >> 64, a & LO_MASK);
    let (b_hi, b_lo) = (b >> 64, b & LO_MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    // Sum of three values below 2^64 each: cannot overflow.
    let mid = (ll >> 64) + (lh & LO_MASK) + (hl & LO_MASK);

    let lo = (ll & LO_MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// `floor(a * b / c)` without intermediate overflow.
///
/// Returns `None` when `c == 0` or when the quotient exceeds `u128::MAX`.
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    let (hi, lo) = widening_mul(a, b);
    if hi == 0 {
        return Some(lo / c);
    }
    if hi >= c {
        return None;
    }

    // Restoring long division of (hi:lo) by c. rem < c holds between steps.
    let mut rem = hi;
    let mut quo: u128 = 0;
    for bit in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> bit) & 1);
        quo <<= 1;
        if carry == 1 || rem >= c {
            rem = rem.wrapping_sub(c);
            quo |= 1;
        }
    }
    Some(quo)
}

// ============================================================================
// Unaligned Integers
// ============================================================================
//
// Engine records are viewed in place over account data. Storing integers as
// little-endian byte arrays keeps every record at alignment 1, so the view
// never depends on where the runtime placed the account buffer and the
// layout is identical on SBF and on the host (where u128 is 16-aligned).

macro_rules! le_int {
    ($name:ident, $t:ty, $n:expr) => {
        #[repr(transparent)]
        #[derive(Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
        pub struct $name([u8; $n]);

        impl $name {
            pub const ZERO: Self = Self([0; $n]);

            #[inline]
            pub const fn new(val: $t) -> Self {
                Self(val.to_le_bytes())
            }

            #[inline]
            pub const fn get(self) -> $t {
                <$t>::from_le_bytes(self.0)
            }

            #[inline]
            pub fn set(&mut self, val: $t) {
                self.0 = val.to_le_bytes();
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.get())
            }
        }
    };
}

le_int!(U128, u128, 16);
le_int!(U64, u64, 8);
le_int!(I64, i64, 8);
