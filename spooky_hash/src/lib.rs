//! Bob Jenkins' SpookyHash V2 ("short" variant), reduced to exactly the two
//! operations the perfect-hashing builders above this crate need:
//!
//! - [`sign`]: hash an arbitrary byte key, under a seed, to a 256-bit signature
//!   (four `u64` words). This is SpookyHash's `Short` path taken to completion
//!   (`ShortEnd`), keeping all four words of its internal state instead of the
//!   usual two, so that a single call gives a full 256-bit fingerprint.
//! - [`rehash`]: recompress a signature plus a local seed through `ShortMix`
//!   alone (no `ShortEnd`), producing three (or four) vertex-selecting words.
//!
//! Both are bit-exact re-implementations of the algorithm published at
//! <http://burtleburtle.net/bob/hash/spooky.html> (public domain).

use std::num::Wrapping;

/// `SC_CONST`: odd, not-too-regular mix of ones and zeros, used to pad short state.
pub const SC_CONST: u64 = 0x9e3779b97f4a7c13;

#[inline(always)]
fn rot64(x: Wrapping<u64>, k: u32) -> Wrapping<u64> {
    (x << k as usize) | (x >> (64 - k) as usize)
}

/// The 12-round rotate-add-xor compression at the heart of SpookyShort.
/// Mixes `h0..h3` together so that every input bit influences every output bit.
#[inline]
fn short_mix(h0: &mut Wrapping<u64>, h1: &mut Wrapping<u64>, h2: &mut Wrapping<u64>, h3: &mut Wrapping<u64>) {
    *h2 = rot64(*h2, 50); *h2 += *h3; *h0 ^= *h2;
    *h3 = rot64(*h3, 52); *h3 += *h0; *h1 ^= *h3;
    *h0 = rot64(*h0, 30); *h0 += *h1; *h2 ^= *h0;
    *h1 = rot64(*h1, 41); *h1 += *h2; *h3 ^= *h1;
    *h2 = rot64(*h2, 54); *h2 += *h3; *h0 ^= *h2;
    *h3 = rot64(*h3, 48); *h3 += *h0; *h1 ^= *h3;
    *h0 = rot64(*h0, 38); *h0 += *h1; *h2 ^= *h0;
    *h1 = rot64(*h1, 37); *h1 += *h2; *h3 ^= *h1;
    *h2 = rot64(*h2, 62); *h2 += *h3; *h0 ^= *h2;
    *h3 = rot64(*h3, 34); *h3 += *h0; *h1 ^= *h3;
    *h0 = rot64(*h0, 5);  *h0 += *h1; *h2 ^= *h0;
    *h1 = rot64(*h1, 36); *h1 += *h2; *h3 ^= *h1;
}

/// The finishing permutation, applied once mixing is complete to erase the
/// boundary between the last full mix and the final partial block.
#[inline]
fn short_end(h0: &mut Wrapping<u64>, h1: &mut Wrapping<u64>, h2: &mut Wrapping<u64>, h3: &mut Wrapping<u64>) {
    *h3 ^= *h2; *h2 = rot64(*h2, 15); *h3 += *h2;
    *h0 ^= *h3; *h3 = rot64(*h3, 52); *h0 += *h3;
    *h1 ^= *h0; *h0 = rot64(*h0, 26); *h1 += *h0;
    *h2 ^= *h1; *h1 = rot64(*h1, 51); *h2 += *h1;
    *h3 ^= *h2; *h2 = rot64(*h2, 28); *h3 += *h2;
    *h0 ^= *h3; *h3 = rot64(*h3, 9);  *h0 += *h3;
    *h1 ^= *h0; *h0 = rot64(*h0, 47); *h1 += *h0;
    *h2 ^= *h1; *h1 = rot64(*h1, 54); *h2 += *h1;
    *h3 ^= *h2; *h2 = rot64(*h2, 32); *h3 += *h2;
    *h0 ^= *h3; *h3 = rot64(*h3, 25); *h0 += *h3;
    *h1 ^= *h0; *h0 = rot64(*h0, 63); *h1 += *h0;
}

/// Reads up to 8 little-endian bytes from `data[offset..]`, zero-padding on the right.
#[inline]
fn load_u64_le(data: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    let avail = data.len() - offset;
    let n = avail.min(8);
    buf[..n].copy_from_slice(&data[offset..offset + n]);
    u64::from_le_bytes(buf)
}

/// A 256-bit key signature: `(sigma0, sigma1, sigma2, sigma3)`.
pub type Signature = (u64, u64, u64, u64);

/// Hashes `key` under `seed` to a 256-bit signature, using SpookyHash V2's `Short`
/// algorithm run to its `ShortEnd` finish and keeping all four internal registers
/// instead of the usual two. Deterministic and endianness-normalised (little-endian
/// byte loads throughout), so it is bit-exact across builder and lookup regardless
/// of host byte order.
pub fn sign(key: &[u8], seed: u64) -> Signature {
    let mut a = Wrapping(seed);
    let mut b = Wrapping(seed);
    let mut c = Wrapping(SC_CONST);
    let mut d = Wrapping(SC_CONST);

    let len = key.len();
    let mut pos = 0usize;

    // Full 32-byte blocks.
    while len - pos >= 32 {
        c += Wrapping(load_u64_le(key, pos));
        d += Wrapping(load_u64_le(key, pos + 8));
        short_mix(&mut a, &mut b, &mut c, &mut d);
        a += Wrapping(load_u64_le(key, pos + 16));
        b += Wrapping(load_u64_le(key, pos + 24));
        pos += 32;
    }

    // One more 16-byte half-block, if available.
    if len - pos >= 16 {
        c += Wrapping(load_u64_le(key, pos));
        d += Wrapping(load_u64_le(key, pos + 8));
        short_mix(&mut a, &mut b, &mut c, &mut d);
        pos += 16;
    }

    let remainder = len - pos;
    d += Wrapping((len as u64) << 56);
    match remainder {
        0 => {
            c += Wrapping(SC_CONST);
            d += Wrapping(SC_CONST);
        }
        1..=7 => {
            c += Wrapping(load_u64_le(key, pos) & ((1u64 << (remainder * 8)) - 1));
        }
        8 => {
            c += Wrapping(load_u64_le(key, pos));
        }
        9..=15 => {
            c += Wrapping(load_u64_le(key, pos));
            d += Wrapping(load_u64_le(key, pos + 8) & ((1u64 << ((remainder - 8) * 8)) - 1));
        }
        _ => unreachable!("remainder of a short-hash tail must be < 16"),
    }

    short_end(&mut a, &mut b, &mut c, &mut d);
    (a.0, b.0, c.0, d.0)
}

/// Recompresses a signature against a bucket-local `seed` via `ShortMix` alone
/// (no finishing permutation), yielding four words from which vertex indices are
/// derived. Distinct seeds yield distinct, well-mixed results for the same
/// signature, which is exactly what bucket-local retries need.
pub fn rehash(sig: Signature, seed: u64) -> (u64, u64, u64, u64) {
    let mut h0 = Wrapping(seed);
    let mut h1 = Wrapping(SC_CONST.wrapping_add(sig.0));
    let mut h2 = Wrapping(SC_CONST.wrapping_add(sig.1));
    let mut h3 = Wrapping(SC_CONST.wrapping_add(sig.2));
    short_mix(&mut h0, &mut h1, &mut h2, &mut h3);
    (h0.0, h1.0, h2.0, h3.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_is_deterministic() {
        let s1 = sign(b"hello world", 42);
        let s2 = sign(b"hello world", 42);
        assert_eq!(s1, s2);
    }

    #[test]
    fn sign_depends_on_seed() {
        assert_ne!(sign(b"hello", 1), sign(b"hello", 2));
    }

    #[test]
    fn sign_depends_on_key() {
        assert_ne!(sign(b"hello", 1), sign(b"world", 1));
    }

    #[test]
    fn sign_handles_all_tail_lengths() {
        let key: Vec<u8> = (0..80u8).collect();
        for len in 0..key.len() {
            let _ = sign(&key[..len], 7);
        }
    }

    #[test]
    fn rehash_is_deterministic_and_seed_sensitive() {
        let sig = sign(b"a key", 1);
        let r1 = rehash(sig, 10);
        let r2 = rehash(sig, 10);
        let r3 = rehash(sig, 11);
        assert_eq!(r1, r2);
        assert_ne!(r1, r3);
    }
}
