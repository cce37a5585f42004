//! Fixed-point bandwidth shares.
//!
//! Interleaved transfers progress by `bandwidth / n` bytes per tick,
//! which is rarely a whole number. Byte counts are held with 64
//! fractional bits in a `u128`; a `u64` byte count shifted left by 64
//! always fits. The per-transfer share is rounded up so an even split
//! (`256` bytes at `128 / 2`) drains in exactly the expected tick.

const FRAC_BITS: u32 = 64;
const FRAC_MASK: u128 = (1u128 << FRAC_BITS) - 1;

/// Convert whole bytes to fixed point.
pub(crate) fn to_fixed(bytes: u64) -> u128 {
    u128::from(bytes) << FRAC_BITS
}

/// Per-transfer share of `bandwidth` among `n` transfers, rounded up.
pub(crate) fn share(bandwidth: u64, n: usize) -> u128 {
    debug_assert!(n > 0);
    to_fixed(bandwidth).div_ceil(n as u128)
}

/// Ticks needed to move `remaining` at `share` per tick.
pub(crate) fn ticks_to_drain(remaining: u128, share: u128) -> u64 {
    u64::try_from(remaining.div_ceil(share)).unwrap_or(u64::MAX)
}

/// Accumulates fractional bytes and releases whole ones.
#[derive(Clone, Debug, Default)]
pub(crate) struct ByteCarry {
    fraction: u128,
}

impl ByteCarry {
    /// Add `moved` fixed-point bytes; return the whole bytes now complete.
    pub(crate) fn add(&mut self, moved: u128) -> u64 {
        let total = self.fraction + moved;
        self.fraction = total & FRAC_MASK;
        u64::try_from(total >> FRAC_BITS).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split_is_exact() {
        let s = share(128, 2);
        assert_eq!(s, to_fixed(64));
        assert_eq!(ticks_to_drain(to_fixed(256), s), 4);
    }

    #[test]
    fn uneven_split_rounds_share_up() {
        // 128 / 3 is 42.67 bytes per tick: 128 bytes drain in 3 ticks, not 4.
        let s = share(128, 3);
        assert_eq!(ticks_to_drain(to_fixed(128), s), 3);
        assert_eq!(ticks_to_drain(to_fixed(129), s), 4);
    }

    #[test]
    fn carry_releases_whole_bytes() {
        let mut carry = ByteCarry::default();
        let third = share(1, 3);
        assert_eq!(carry.add(third), 0);
        assert_eq!(carry.add(third), 0);
        assert_eq!(carry.add(third), 1);
    }
}
