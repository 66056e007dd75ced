//! BucketedBuilder (§4.7): multiplicative bucketing plus a per-bucket,
//! then per-global, retry loop around [`crate::peeler`] (MPH) or
//! [`crate::f2solver`] (SF/CSF).
//!
//! Grounded on `csf/src/ls/map.rs`'s `Map::try_with_vertex_t_conf_fn` for the
//! overall "try a seed, peel, retry on failure" shape, generalised from one
//! global attempt to a nested per-bucket/per-global retry (`DESIGN.md`).

use std::collections::HashMap;

use bitm::{BitAccess, BitVec};
use minimum_redundancy::Coding;
use spooky_hash::Signature;

use crate::bucketing;
use crate::edge::edge3;
use crate::error::BuildError;
use crate::f2solver;
use crate::image::{pack_offset_seed, CsfImageParts, Image, StoredVariant};
use crate::options::{BuildOptions, Variant};
use crate::peeler;

/// Deterministic per-bucket, per-attempt local seed, derived from the
/// bucket's global attempt seed so both the builder and [`crate::lookup`]
/// can recompute it from nothing but `(beta, attempt, global_seed)` —
/// avoiding the need to fit a full 56-bit local seed into the handful of
/// high bits `offset_and_seed` actually has free once the offset field is
/// accounted for (§9 Open Question, see `DESIGN.md`).
pub(crate) fn local_seed(beta: u64, attempt: u32, global_seed: u64) -> u64 {
    global_seed ^ beta.wrapping_mul(0x9e3779b97f4a7c13) ^ (attempt as u64).wrapping_mul(0xbf58476d1ce4e5b9)
}

fn check_for_duplicate_signatures<K: AsRef<[u8]>>(keys: &[K], seed: u64) -> Result<(), BuildError> {
    let mut sigs: Vec<Signature> = keys.iter().map(|k| spooky_hash::sign(k.as_ref(), seed)).collect();
    sigs.sort_unstable();
    if sigs.windows(2).any(|w| w[0] == w[1]) {
        return Err(BuildError::DuplicateKey);
    }
    Ok(())
}

fn build_coding(values: &[u64], max_codeword_length: u8) -> Coding {
    let mut freqs: HashMap<u64, u32> = HashMap::with_capacity(values.len());
    for &v in values {
        *freqs.entry(v).or_insert(0) += 1;
    }
    Coding::build(freqs, max_codeword_length)
}

/// Builds an [`Image`] over `keys`. `values` is read for `Sf`/`Csf` variants
/// (must have `keys.len()` entries; a key's value is `values[i]`) and
/// ignored (may be empty) for `Mph`.
pub fn build<K: AsRef<[u8]>>(keys: &[K], values: &[u64], options: &BuildOptions) -> Result<Image, BuildError> {
    build_cancellable(keys, values, options, &|| false)
}

/// As [`build`], but polls `should_cancel` between buckets and returns
/// [`BuildError::Cancelled`] as soon as it answers `true` (§5).
pub fn build_cancellable<K: AsRef<[u8]>>(
    keys: &[K],
    values: &[u64],
    options: &BuildOptions,
    should_cancel: &dyn Fn() -> bool,
) -> Result<Image, BuildError> {
    let n = keys.len();

    if options.duplicate_key_check && n > 1 {
        check_for_duplicate_signatures(keys, options.global_seed)?;
    }

    let (m, multiplier) = bucketing::plan(n, options.bucket_size());

    let coding = match options.variant {
        Variant::Csf { max_codeword_length } => Some(build_coding(values, max_codeword_length)),
        _ => None,
    };

    let mut last_failure: Option<usize> = None;
    for global_attempt in 0..options.max_global_attempts {
        if should_cancel() {
            return Err(BuildError::Cancelled);
        }
        let global_seed = options.attempt_seed(global_attempt);
        match try_build_once(keys, values, options, global_seed, m, multiplier, coding.as_ref(), should_cancel) {
            Ok(image) => return Ok(image),
            Err(CancelledOrBucket::Cancelled) => return Err(BuildError::Cancelled),
            Err(CancelledOrBucket::Bucket(beta)) => last_failure = Some(beta),
        }
    }

    match last_failure {
        Some(bucket) => Err(BuildError::BuildFailed { bucket }),
        None => Err(BuildError::BuildFailedGlobal),
    }
}

enum CancelledOrBucket {
    Cancelled,
    Bucket(usize),
}

#[allow(clippy::too_many_arguments)]
fn try_build_once<K: AsRef<[u8]>>(
    keys: &[K],
    values: &[u64],
    options: &BuildOptions,
    global_seed: u64,
    m: usize,
    multiplier: u64,
    coding: Option<&Coding>,
    should_cancel: &dyn Fn() -> bool,
) -> Result<Image, CancelledOrBucket> {
    let n = keys.len();
    let sigs: Vec<Signature> = keys.iter().map(|k| spooky_hash::sign(k.as_ref(), global_seed)).collect();

    let mut bucket_members: Vec<Vec<usize>> = vec![Vec::new(); m];
    for (i, sig) in sigs.iter().enumerate() {
        bucket_members[bucketing::bucket_of(sig.0, multiplier)].push(i);
    }

    let expansion = options.variant.expansion_constant();
    let value_width = match options.variant {
        Variant::Mph => 2u8,
        Variant::Sf { bit_width } => bit_width,
        Variant::Csf { max_codeword_length } => max_codeword_length,
    };
    let offset_bits = options.variant.offset_bits();
    let escape_width = coding.and_then(|c| c.escape_width());

    let mut vertex_count_of = vec![0u32; m];
    let mut vertex_offset_of = vec![0u64; m + 1];
    let mut key_offset_of = vec![0u64; m + 1];
    for beta in 0..m {
        let len = bucket_members[beta].len();
        let vc = if len == 0 {
            0
        } else {
            (len as u32).max((len as f64 * expansion).ceil() as u32)
        };
        vertex_count_of[beta] = vc;
        vertex_offset_of[beta + 1] = vertex_offset_of[beta] + vc as u64;
        key_offset_of[beta + 1] = key_offset_of[beta] + len as u64;
    }
    let total_vertices = vertex_offset_of[m];

    let mut array = Box::<[u64]>::with_zeroed_bits(total_vertices as usize * value_width as usize);
    let mut escape_array = escape_width.map(|w| Box::<[u64]>::with_zeroed_bits(total_vertices as usize * w as usize));
    let mut offset_and_seed = vec![0u64; m + 1];

    for beta in 0..m {
        if beta % 4096 == 0 && should_cancel() {
            return Err(CancelledOrBucket::Cancelled);
        }
        let members = &bucket_members[beta];
        let vc = vertex_count_of[beta];
        let vertex_offset = vertex_offset_of[beta];

        let attempt = if members.is_empty() {
            0
        } else {
            match solve_bucket(members, &sigs, values, vc, beta as u64, global_seed, options, coding, &mut array, escape_array.as_deref_mut(), vertex_offset, value_width, escape_width) {
                Some(attempt) => attempt,
                None => return Err(CancelledOrBucket::Bucket(beta)),
            }
        };
        offset_and_seed[beta] = pack_offset_seed(vertex_offset, attempt, offset_bits);
    }
    offset_and_seed[m] = pack_offset_seed(total_vertices, 0, offset_bits);

    let variant = match options.variant {
        Variant::Mph => StoredVariant::Mph,
        Variant::Sf { bit_width } => StoredVariant::Sf { bit_width },
        Variant::Csf { max_codeword_length } => StoredVariant::Csf { max_codeword_length },
    };

    let key_offset = matches!(options.variant, Variant::Mph).then(|| key_offset_of.into_boxed_slice());
    let csf = coding.map(|c| CsfImageParts {
        decoding_table: clone_decoding_table(c),
        escape_width,
        escape_array,
    });

    Ok(Image {
        variant,
        n: n as u64,
        multiplier,
        global_seed,
        offset_bits,
        offset_and_seed: offset_and_seed.into_boxed_slice(),
        array,
        key_offset,
        csf,
    })
}

/// [`minimum_redundancy::DecodingTable`] has no `Clone`; its parts are
/// plain slices, so copy them field-by-field into a fresh table for the
/// `Image` this attempt produces.
fn clone_decoding_table(coding: &Coding) -> minimum_redundancy::DecodingTable {
    let t = coding.decoding_table();
    minimum_redundancy::DecodingTable::from_parts(
        t.max_length(),
        t.last_codeword_plus_one().to_vec().into_boxed_slice(),
        t.how_many_up_to_block().to_vec().into_boxed_slice(),
        t.shift().to_vec().into_boxed_slice(),
        t.symbols().to_vec().into_boxed_slice(),
    )
}

/// Attempts to solve one bucket, retrying with a fresh local seed up to
/// `options.max_attempts_per_bucket` times. On success, writes the
/// resolved fields directly into the global `array`/`escape_array` slices
/// at this bucket's vertex range and returns the winning attempt index.
#[allow(clippy::too_many_arguments)]
fn solve_bucket(
    members: &[usize],
    sigs: &[Signature],
    values: &[u64],
    vc: u32,
    beta: u64,
    global_seed: u64,
    options: &BuildOptions,
    coding: Option<&Coding>,
    array: &mut [u64],
    mut escape_array: Option<&mut [u64]>,
    vertex_offset: u64,
    value_width: u8,
    escape_width: Option<u8>,
) -> Option<u32> {
    for attempt in 0..options.max_attempts_per_bucket {
        let seed = local_seed(beta, attempt, global_seed);
        let edges: Vec<_> = members.iter().map(|&i| edge3(sigs[i], seed, vc)).collect();

        match options.variant {
            Variant::Mph => {
                if let Some(val) = peeler::peel(&edges, vc) {
                    for (local, &v) in val.iter().enumerate() {
                        array.set_fragment(vertex_offset as usize + local, v as u64, value_width);
                    }
                    return Some(attempt);
                }
            }
            Variant::Sf { .. } => {
                let eqs: Vec<(Vec<u32>, u64)> = edges.iter().zip(members.iter())
                    .map(|(e, &i)| (e.to_vec(), values[i]))
                    .collect();
                if let Some(x) = f2solver::solve(&eqs, vc) {
                    for (local, &v) in x.iter().enumerate() {
                        array.set_fragment(vertex_offset as usize + local, v, value_width);
                    }
                    return Some(attempt);
                }
            }
            Variant::Csf { .. } => {
                let coding = coding.expect("Csf variant always carries a Coding");
                let main_eqs: Vec<(Vec<u32>, u64)> = edges.iter().zip(members.iter())
                    .map(|(e, &i)| (e.to_vec(), coding.encode_left_justified(values[i])))
                    .collect();
                let Some(x_main) = f2solver::solve(&main_eqs, vc) else { continue };

                let escaped: Vec<(Vec<u32>, u64)> = edges.iter().zip(members.iter())
                    .filter(|(_, &i)| coding.is_escaped(values[i]))
                    .map(|(e, &i)| (e.to_vec(), values[i]))
                    .collect();
                let x_escape = if escaped.is_empty() {
                    None
                } else {
                    match f2solver::solve(&escaped, vc) {
                        Some(x) => Some(x),
                        None => continue,
                    }
                };

                for (local, &v) in x_main.iter().enumerate() {
                    array.set_fragment(vertex_offset as usize + local, v, value_width);
                }
                if let Some(x_escape) = x_escape {
                    let escape_array = escape_array.as_mut().expect("escape solve ran without an escape array");
                    let w = escape_width.expect("escape solve ran without a configured escape width");
                    for (local, &v) in x_escape.iter().enumerate() {
                        escape_array.set_fragment(vertex_offset as usize + local, v, w);
                    }
                }
                return Some(attempt);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{BuildOptions, Variant};

    #[test]
    fn builds_a_tiny_mph() {
        let keys: Vec<&[u8]> = vec![b"alpha", b"bravo", b"charlie", b"delta", b"echo"];
        let opts = BuildOptions::new(Variant::Mph);
        let image = build(&keys, &[], &opts).expect("should build");
        assert_eq!(image.len(), 5);
    }

    #[test]
    fn builds_sf_with_small_bit_width() {
        let keys: Vec<&[u8]> = vec![b"one", b"two", b"three", b"four"];
        let values = vec![1u64, 2, 3, 0];
        let opts = BuildOptions::new(Variant::Sf { bit_width: 2 });
        let image = build(&keys, &values, &opts).expect("should build");
        assert_eq!(image.len(), 4);
    }

    #[test]
    fn builds_csf_over_a_skewed_distribution() {
        let keys: Vec<Vec<u8>> = (0u32..200).map(|i| i.to_le_bytes().to_vec()).collect();
        let values: Vec<u64> = (0u32..200).map(|i| (i % 5) as u64).collect();
        let opts = BuildOptions::new(Variant::Csf { max_codeword_length: 4 });
        let image = build(&keys, &values, &opts).expect("should build");
        assert_eq!(image.len(), 200);
    }

    #[test]
    fn rejects_duplicate_signatures_before_building() {
        let keys: Vec<&[u8]> = vec![b"same", b"same"];
        let opts = BuildOptions::new(Variant::Mph);
        assert!(matches!(build(&keys, &[], &opts), Err(BuildError::DuplicateKey)));
    }
}
