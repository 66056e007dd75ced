//! Multiplicative bucketing (§3): maps a 256-bit signature onto one of `m`
//! buckets via a single 128-bit product, the same fast-range-reduction shape
//! as a Lemire-style `map64_to_64`. See `DESIGN.md`, Open Question 5, for why
//! `multiplier` is defined to equal the bucket count `m` directly rather than
//! via the literal `⌈2⁶⁴/n⌉ · expected_bucket_size` derivation.

/// Picks `m` (bucket count) for `n` keys averaging `expected_bucket_size`
/// signatures per bucket, and the matching `multiplier`.
pub(crate) fn plan(n: usize, expected_bucket_size: usize) -> (usize, u64) {
    let m = 1.max(n.div_ceil(expected_bucket_size.max(1)));
    (m, m as u64)
}

/// `β(σ) = ((σ₀ >> 1) · multiplier) >> 64`.
#[inline]
pub(crate) fn bucket_of(sigma0: u64, multiplier: u64) -> usize {
    (((sigma0 >> 1) as u128 * multiplier as u128) >> 64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_index_always_in_range() {
        let (m, multiplier) = plan(1_000_000, 1500);
        assert!(m >= 1);
        let mut seen_nonzero = false;
        for i in 0..200_000u64 {
            let sigma0 = i.wrapping_mul(0x9e3779b97f4a7c13).rotate_left(17);
            let b = bucket_of(sigma0, multiplier);
            assert!(b < m);
            if b > 0 { seen_nonzero = true; }
        }
        assert!(seen_nonzero);
    }

    #[test]
    fn single_bucket_when_hint_covers_everything() {
        let (m, multiplier) = plan(10, 1500);
        assert_eq!(m, 1);
        for i in 0..1000u64 {
            assert_eq!(bucket_of(i.wrapping_mul(0xabcdef1234567), multiplier), 0);
        }
    }

    #[test]
    fn roughly_uniform_distribution() {
        let (m, multiplier) = plan(100_000, 1000);
        let mut counts = vec![0u32; m];
        for i in 0..100_000u64 {
            let sigma0 = i.wrapping_mul(0x2545F4914F6CDD1D) ^ (i << 21);
            counts[bucket_of(sigma0, multiplier)] += 1;
        }
        let max = *counts.iter().max().unwrap();
        let avg = 100_000 / m as u32;
        assert!(max < avg * 5, "bucket {max} vs avg {avg} looks far from uniform");
    }
}
