//! Canonical, length-limited Huffman coding with an escape codeword, plus the
//! array-based decoding table that turns a fixed-width codeword back into a
//! value (or a signal that the value was escaped) without walking a tree.

use std::collections::HashMap;
use crate::frequencies::Frequencies;
use crate::package_merge::limited_lengths;

/// Sentinel stored in [`DecodingTable::symbols`] at the position reserved for
/// the escape codeword.
pub const ESCAPE_SENTINEL: i64 = -1;

fn bits_to_store(v: u64) -> u8 {
    64 - v.leading_zeros() as u8
}

/// A codeword: its `bits` right-justified in the low `len` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codeword {
    pub bits: u64,
    pub len: u8,
}

/// Result of decoding a fixed-width codeword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Value(u64),
    Escape,
}

/// Parallel arrays that let a `max_length`-bit, left-justified codeword be
/// decoded in O(max_length) time without walking a Huffman tree: find the
/// smallest `i` with `x < last_codeword_plus_one[i]`, then read
/// `symbols[(x >> shift[i]) + how_many_up_to_block[i] - (last_codeword_plus_one[i] >> shift[i])]`.
///
/// Index 0 of every array is an unreachable sentinel (`0`), so codeword
/// lengths are indexed `1..=max_length`; this keeps the arrays `max_length + 1`
/// entries long, matching the on-disk layout.
pub struct DecodingTable {
    max_length: u8,
    last_codeword_plus_one: Box<[u64]>,
    how_many_up_to_block: Box<[u32]>,
    shift: Box<[u32]>,
    symbols: Box<[i64]>,
}

impl DecodingTable {
    pub fn max_length(&self) -> u8 { self.max_length }
    pub fn last_codeword_plus_one(&self) -> &[u64] { &self.last_codeword_plus_one }
    pub fn how_many_up_to_block(&self) -> &[u32] { &self.how_many_up_to_block }
    pub fn shift(&self) -> &[u32] { &self.shift }
    pub fn symbols(&self) -> &[i64] { &self.symbols }

    pub fn from_parts(
        max_length: u8,
        last_codeword_plus_one: Box<[u64]>,
        how_many_up_to_block: Box<[u32]>,
        shift: Box<[u32]>,
        symbols: Box<[i64]>,
    ) -> Self {
        debug_assert_eq!(last_codeword_plus_one.len(), max_length as usize + 1);
        debug_assert_eq!(how_many_up_to_block.len(), max_length as usize + 1);
        debug_assert_eq!(shift.len(), max_length as usize + 1);
        Self { max_length, last_codeword_plus_one, how_many_up_to_block, shift, symbols }
    }

    /// Decodes a `max_length`-bit, left-justified codeword `x`.
    ///
    /// Always returns some decoded value without panicking, even for an `x`
    /// that was never produced by this table's encoder (e.g. while looking up
    /// a key that was not part of the original data set) — the result is
    /// simply unspecified in that case, matching the lookup contract.
    pub fn decode(&self, x: u64) -> Decoded {
        let mut i = 1usize;
        while i < self.max_length as usize && x >= self.last_codeword_plus_one[i] {
            i += 1;
        }
        let block_top = self.last_codeword_plus_one[i] >> self.shift[i];
        let raw = (x >> self.shift[i]) + self.how_many_up_to_block[i] as u64;
        let index = raw.saturating_sub(block_top) as usize;
        let index = index.min(self.symbols.len() - 1);
        match self.symbols[index] {
            ESCAPE_SENTINEL => Decoded::Escape,
            v => Decoded::Value(v as u64),
        }
    }
}

/// A length-limited canonical Huffman code over a multiset of `u64` values,
/// with an escape codeword reserved whenever more distinct values occur than
/// `max_length` bits can individually address.
pub struct Coding {
    max_length: u8,
    escape_width: Option<u8>,
    codewords: HashMap<u64, Codeword>,
    escape_codeword: Option<Codeword>,
    table: DecodingTable,
}

impl Coding {
    /// Builds a code over the values counted by `freqs`, with every codeword
    /// at most `max_length` bits. Panics if `max_length` is zero or if `freqs`
    /// is empty.
    pub fn build<F: Frequencies<Value = u64>>(freqs: F, max_length: u8) -> Self {
        let (values, freq) = freqs.into_sorted();
        Self::build_from_sorted(values, freq, max_length)
    }

    /// As [`Coding::build`], but takes distinct values and their occurrence
    /// counts directly, both sorted by non-decreasing frequency (as returned
    /// by [`Frequencies::into_sorted`]).
    pub fn build_from_sorted(values: Box<[u64]>, freq: Box<[u32]>, max_length: u8) -> Self {
        assert!(max_length > 0, "max_length must be at least 1");
        let n = values.len();
        assert!(n > 0, "cannot build a code over zero values");
        assert_eq!(values.len(), freq.len());

        let capacity: u64 = if max_length >= 64 { u64::MAX } else { 1u64 << max_length };

        // Escape the rarest values (the smallest-frequency prefix, since
        // `values`/`freq` are sorted ascending) until what remains, plus one
        // slot for the escape symbol itself, fits within `capacity` leaves.
        let mut escape_count = 0usize;
        while (n - escape_count) as u64 + (escape_count > 0) as u64 > capacity {
            escape_count += 1;
        }

        let escape_width = if escape_count > 0 {
            let max_escaped_value = values[..escape_count].iter().copied().max().unwrap();
            Some(bits_to_store(max_escaped_value).max(1))
        } else {
            None
        };

        let item_count = n - escape_count + (escape_count > 0) as usize;
        let mut weights = Vec::with_capacity(item_count);
        let mut syms: Vec<Option<u64>> = Vec::with_capacity(item_count);
        if escape_count > 0 {
            let escape_weight: u64 = freq[..escape_count].iter().map(|&f| f as u64).sum();
            weights.push(escape_weight);
            syms.push(None);
        }
        for i in escape_count..n {
            weights.push(freq[i] as u64);
            syms.push(Some(values[i]));
        }

        let lengths = limited_lengths(&weights, max_length);

        // Bucket by length; within a length, the escape symbol (if present)
        // is ordered first so its codeword is the smallest of its block.
        let mut by_length: Vec<Vec<(Option<u64>, u8)>> = vec![Vec::new(); max_length as usize + 1];
        for (idx, &len) in lengths.iter().enumerate() {
            by_length[len as usize].push((syms[idx], len));
        }
        for bucket in by_length.iter_mut() {
            bucket.sort_by_key(|(v, _)| v.is_some());
        }

        let mut ordered: Vec<(Option<u64>, u8)> = Vec::with_capacity(item_count);
        for l in 1..=max_length as usize {
            ordered.extend(by_length[l].iter().copied());
        }

        let mut count = vec![0u32; max_length as usize + 1];
        for &(_, l) in &ordered {
            count[l as usize] += 1;
        }

        let mut first_code = vec![0u64; max_length as usize + 1];
        for l in 2..=max_length as usize {
            first_code[l] = (first_code[l - 1] + count[l - 1] as u64) << 1;
        }

        let mut shift = vec![0u32; max_length as usize + 1];
        let mut last_codeword_plus_one = vec![0u64; max_length as usize + 1];
        for l in 1..=max_length as usize {
            shift[l] = max_length as u32 - l as u32;
            last_codeword_plus_one[l] = (first_code[l] + count[l] as u64) << shift[l];
        }

        let mut how_many_up_to_block = vec![0u32; max_length as usize + 1];
        for l in 1..=max_length as usize {
            how_many_up_to_block[l] = how_many_up_to_block[l - 1] + count[l];
        }

        let mut symbols = Vec::with_capacity(ordered.len());
        let mut codewords = HashMap::with_capacity(n);
        let mut escape_codeword = None;
        let mut next_code = first_code.clone();
        for &(v, l) in &ordered {
            let code = next_code[l as usize];
            next_code[l as usize] += 1;
            match v {
                None => {
                    escape_codeword = Some(Codeword { bits: code, len: l });
                    symbols.push(ESCAPE_SENTINEL);
                }
                Some(value) => {
                    codewords.insert(value, Codeword { bits: code, len: l });
                    symbols.push(value as i64);
                }
            }
        }

        let table = DecodingTable::from_parts(
            max_length,
            last_codeword_plus_one.into_boxed_slice(),
            how_many_up_to_block.into_boxed_slice(),
            shift.into_boxed_slice(),
            symbols.into_boxed_slice(),
        );

        Self { max_length, escape_width, codewords, escape_codeword, table }
    }

    pub fn max_length(&self) -> u8 { self.max_length }

    /// Bits needed to store an escaped value verbatim, or `None` if no value
    /// needed escaping (every value got its own codeword).
    pub fn escape_width(&self) -> Option<u8> { self.escape_width }

    pub fn is_escaped(&self, value: u64) -> bool {
        !self.codewords.contains_key(&value)
    }

    /// Returns `value`'s codeword, or the escape codeword if `value` was not
    /// given one of its own. Panics if no code was built at all for escape
    /// and `value` is unknown to this coding.
    pub fn codeword(&self, value: u64) -> Codeword {
        self.codewords.get(&value).copied().unwrap_or_else(|| {
            self.escape_codeword.expect("value has no codeword and no escape codeword was reserved")
        })
    }

    /// `codeword(value)` left-justified into `max_length` bits, as stored in
    /// (and XORed out of) the output array.
    pub fn encode_left_justified(&self, value: u64) -> u64 {
        let cw = self.codeword(value);
        cw.bits << (self.max_length - cw.len)
    }

    pub fn decoding_table(&self) -> &DecodingTable { &self.table }

    pub fn decode(&self, x: u64) -> Decoded { self.table.decode(x) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    fn freqs(pairs: &[(u64, u32)]) -> StdHashMap<u64, u32> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn round_trips_without_escape() {
        let coding = Coding::build(freqs(&[(0, 100), (1, 50), (2, 10), (3, 1)]), 4);
        assert_eq!(coding.escape_width(), None);
        for &v in &[0u64, 1, 2, 3] {
            let x = coding.encode_left_justified(v);
            assert_eq!(coding.decode(x), Decoded::Value(v));
        }
    }

    #[test]
    fn escapes_when_too_many_symbols_for_limit() {
        // 8 equally likely symbols cannot each get a codeword within 2 bits
        // (capacity 4), so the rarest must escape.
        let pairs: Vec<(u64, u32)> = (0u64..8).map(|v| (v, 1)).collect();
        let coding = Coding::build(freqs(&pairs), 2);
        assert!(coding.escape_width().is_some());
        let mut saw_escape = false;
        for &v in pairs.iter().map(|(v, _)| v) {
            let x = coding.encode_left_justified(v);
            match coding.decode(x) {
                Decoded::Value(d) => assert_eq!(d, v),
                Decoded::Escape => { saw_escape = true; assert!(coding.is_escaped(v)); }
            }
        }
        assert!(saw_escape);
    }

    #[test]
    fn single_value_gets_one_bit_code() {
        let coding = Coding::build(freqs(&[(42, 7)]), 3);
        let x = coding.encode_left_justified(42);
        assert_eq!(coding.decode(x), Decoded::Value(42));
    }

    #[test]
    fn skewed_distribution_needs_escape_at_small_limit() {
        // Mimics a geometric distribution capped at a handful of values with
        // a tight max codeword length.
        let pairs: Vec<(u64, u32)> = (0u64..40).map(|v| (v, (1000u32 >> v.min(10)).max(1))).collect();
        let coding = Coding::build(freqs(&pairs), 6);
        assert!(coding.escape_width().is_some());
        for &(v, _) in &pairs {
            let x = coding.encode_left_justified(v);
            let decoded = coding.decode(x);
            match decoded {
                Decoded::Value(d) => assert_eq!(d, v),
                Decoded::Escape => assert!(coding.is_escaped(v)),
            }
        }
    }
}
