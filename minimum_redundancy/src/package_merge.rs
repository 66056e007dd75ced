//! Length-limited code lengths via the package-merge (coin collector's) method.
//!
//! Ordinary Huffman minimises expected length but can produce codewords longer
//! than a storage budget allows. Package-merge finds the code-length assignment
//! that minimises expected length subject to every length being at most `limit`,
//! which is what a fixed-width decoding table needs.

/// Computes, for `weights` (non-zero, one per symbol, any order), a code length
/// per symbol such that no length exceeds `limit` and the assignment satisfies
/// Kraft's inequality. Panics if `weights.len()` exceeds `2.pow(limit)`, since no
/// such assignment can then exist.
pub fn limited_lengths(weights: &[u64], limit: u8) -> Vec<u8> {
    let n = weights.len();
    assert!(n > 0, "cannot compute code lengths for an empty symbol set");
    assert!(
        (limit as u32) >= 64 || n as u64 <= (1u64 << limit),
        "{} symbols cannot be given codewords of at most {} bits",
        n, limit
    );
    if n == 1 {
        return vec![1];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| weights[i]);

    // originals[i] = (weight, symbol index), sorted by weight; reused at every level.
    let originals: Vec<(u64, usize)> = order.iter().map(|&i| (weights[i], i)).collect();

    // `level` holds, for the current tree depth, a sorted list of items; each item
    // is either an original leaf (one symbol) or a package (a fixed multiset of
    // symbols, represented by how many times each symbol index occurs in it).
    let mut level: Vec<(u64, Vec<usize>)> = originals.iter().map(|&(w, i)| (w, vec![i])).collect();

    for _ in 2..=limit {
        let mut packages: Vec<(u64, Vec<usize>)> = Vec::with_capacity(level.len() / 2);
        let mut it = level.chunks_exact(2);
        for pair in &mut it {
            let mut merged = pair[0].1.clone();
            merged.extend_from_slice(&pair[1].1);
            packages.push((pair[0].0 + pair[1].0, merged));
        }
        // an odd leftover item is simply dropped: it cannot be paired at this level.

        let mut next: Vec<(u64, Vec<usize>)> = Vec::with_capacity(packages.len() + n);
        next.extend(packages);
        next.extend(originals.iter().map(|&(w, i)| (w, vec![i])));
        next.sort_by_key(|item| item.0);
        level = next;
    }

    // The optimal length-limited code corresponds to taking the 2*(n-1) lightest
    // items of the final level and counting, for each symbol, how many of the
    // chosen items mention it: that count is the symbol's code length.
    let take = 2 * (n - 1);
    let mut lengths = vec![0u8; n];
    for (_, idxs) in level.iter().take(take) {
        for &i in idxs {
            lengths[i] += 1;
        }
    }
    debug_assert!(lengths.iter().all(|&l| l >= 1 && l <= limit));
    lengths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kraft_ok(lengths: &[u8]) -> bool {
        let sum: f64 = lengths.iter().map(|&l| 2f64.powi(-(l as i32))).sum();
        sum <= 1.0 + 1e-9
    }

    #[test]
    fn two_symbols() {
        let lens = limited_lengths(&[1, 1], 4);
        assert_eq!(lens, vec![1, 1]);
    }

    #[test]
    fn respects_limit_even_when_unlimited_huffman_would_not() {
        // Fibonacci-like skew that would need depth > 4 under ordinary Huffman.
        let weights = [1u64, 1, 2, 3, 5, 8, 13, 21];
        let lens = limited_lengths(&weights, 4);
        assert!(lens.iter().all(|&l| l <= 4));
        assert!(kraft_ok(&lens));
    }

    #[test]
    fn tight_capacity() {
        // Exactly 2^limit symbols: every length must equal limit.
        let weights = vec![1u64; 8];
        let lens = limited_lengths(&weights, 3);
        assert!(lens.iter().all(|&l| l == 3));
    }

    #[test]
    #[should_panic]
    fn too_many_symbols_for_limit_panics() {
        let weights = vec![1u64; 9];
        limited_lengths(&weights, 3);
    }
}
