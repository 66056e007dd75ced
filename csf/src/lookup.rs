//! Lookup (§4.9): the pure, total, panic-free query path shared by `build`ers
//! and `load`ed images alike. No recoverable errors: every input byte string
//! maps to *some* value, correct for keys that were actually built in and
//! unspecified (but never out-of-range or panicking) for anything else.

use minimum_redundancy::Decoded;

use crate::edge::edge3;
use crate::image::{Image, StoredVariant};
use crate::peeler;
use crate::rank2;

/// Looks up `key` in `image`. For [`crate::options::Variant::Mph`] the
/// result is `key`'s dense index in `[0, n)`; for `Sf`/`Csf` it is the value
/// associated with `key` at build time (meaningless, but still total and
/// panic-free, for a key that was never built in).
pub fn lookup(image: &Image, key: &[u8]) -> u64 {
    let sig = spooky_hash::sign(key, image.global_seed);
    let beta = crate::bucketing::bucket_of(sig.0, image.multiplier);
    let (vertex_offset, attempt) = image.offset_and_attempt(beta);
    let vertex_count = image.vertex_count(beta);
    if vertex_count == 0 {
        return 0;
    }
    let local_seed = crate::builder::local_seed(beta as u64, attempt, image.global_seed);
    let edge = edge3(sig, local_seed, vertex_count);

    match image.variant {
        StoredVariant::Mph => {
            let val_at = |v: u32| (image.get_field(vertex_offset + v as u64, 2)) as u8;
            let pos = peeler::hinge_pos(edge, val_at);
            let hinge_vertex = edge[pos as usize] as u64;
            let key_offset = image.key_offset.as_ref().expect("MPH image missing key_offset")[beta];
            key_offset + rank2::count_nonzero_pairs(
                &image.array,
                vertex_offset as usize,
                (vertex_offset + hinge_vertex) as usize,
            ) as u64
        }
        StoredVariant::Sf { bit_width } => {
            edge.iter()
                .fold(0u64, |acc, &v| acc ^ image.get_field(vertex_offset + v as u64, bit_width))
        }
        StoredVariant::Csf { max_codeword_length } => {
            let codeword = edge.iter()
                .fold(0u64, |acc, &v| acc ^ image.get_field(vertex_offset + v as u64, max_codeword_length));
            let csf = image.csf.as_ref().expect("CSF image missing codec parts");
            match csf.decoding_table.decode(codeword) {
                Decoded::Value(v) => v,
                Decoded::Escape => {
                    edge.iter().fold(0u64, |acc, &v| acc ^ image.get_escape(vertex_offset + v as u64))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::options::{BuildOptions, Variant};

    #[test]
    fn mph_lookup_is_a_dense_bijection() {
        let keys: Vec<Vec<u8>> = (0u32..500).map(|i| i.to_le_bytes().to_vec()).collect();
        let opts = BuildOptions::new(Variant::Mph);
        let image = build(&keys, &[], &opts).expect("should build");
        let mut seen = vec![false; keys.len()];
        for k in &keys {
            let idx = lookup(&image, k);
            assert!(idx < keys.len() as u64, "index {idx} out of range");
            assert!(!seen[idx as usize], "index {idx} produced twice");
            seen[idx as usize] = true;
        }
        assert!(seen.iter().all(|&b| b));
    }

    #[test]
    fn sf_lookup_round_trips_every_key() {
        let keys: Vec<Vec<u8>> = (0u32..400).map(|i| i.to_le_bytes().to_vec()).collect();
        let values: Vec<u64> = (0u32..400).map(|i| (i as u64).wrapping_mul(0x9e3779b9) & 0xff).collect();
        let opts = BuildOptions::new(Variant::Sf { bit_width: 8 });
        let image = build(&keys, &values, &opts).expect("should build");
        for (k, &v) in keys.iter().zip(values.iter()) {
            assert_eq!(lookup(&image, k), v);
        }
    }
}
