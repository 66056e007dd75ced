//! Minimal perfect hash functions, static functions, and compressed static
//! functions built from bucketed 3-uniform hypergraph peeling and F₂
//! linear-system solving over SpookyHash signatures.
//!
//! [`builder::build`] constructs an [`image::Image`] from a key set (and,
//! for [`options::Variant::Sf`]/[`options::Variant::Csf`], a value per key).
//! [`lookup::lookup`] queries it. [`image::dump`]/[`image::load`] persist it.

mod bucketing;
mod edge;
mod error;
mod f2solver;
mod peeler;
mod rank2;

pub mod builder;
pub mod image;
pub mod lookup;
pub mod options;

pub use builder::{build, build_cancellable};
pub use error::{BuildError, LoadError};
pub use image::{dump, load, size_in_bits, Image};
pub use lookup::lookup;
pub use options::{BuildOptions, Variant};

pub use dyn_size_of::GetSize;

/// Minimal number of bits needed to store values from `0` up to and
/// including `max_value`.
///
/// # Example
///
/// ```
/// use csf::bits_to_store;
///
/// assert_eq!(bits_to_store(0u8), 0);
/// assert_eq!(bits_to_store(1u16), 1);
/// assert_eq!(bits_to_store(7u32), 3);
/// assert_eq!(bits_to_store(8u64), 4);
/// ```
#[inline]
pub fn bits_to_store<V: Into<u64>>(max_value: V) -> u8 {
    let max_value: u64 = max_value.into();
    (if max_value.is_power_of_two() {
        max_value.trailing_zeros() + 1
    } else {
        max_value.checked_next_power_of_two().unwrap_or(0).trailing_zeros()
    }) as u8
}

/// Minimal number of bits needed to store any of the given `values`.
///
/// # Example
///
/// ```
/// use csf::bits_to_store_any_of;
///
/// assert_eq!(bits_to_store_any_of([2u8, 7, 5, 7]), 3);
/// assert_eq!(bits_to_store_any_of([0u8]), 0);
/// assert_eq!(bits_to_store_any_of::<u32>([]), 0);
/// ```
pub fn bits_to_store_any_of<V: Into<u64>>(values: impl IntoIterator<Item = V>) -> u8 {
    values.into_iter().map(Into::<u64>::into).max().map_or(0, bits_to_store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_to_store() {
        assert_eq!(bits_to_store(0u32), 0);
        assert_eq!(bits_to_store(1u32), 1);
        assert_eq!(bits_to_store(2u32), 2);
        assert_eq!(bits_to_store(3u32), 2);
        assert_eq!(bits_to_store(4u32), 3);
        assert_eq!(bits_to_store(u32::MAX - 1), 32);
        assert_eq!(bits_to_store(u32::MAX), 32);
        assert_eq!(bits_to_store(u64::MAX), 64);
    }

    #[test]
    fn test_bits_to_store_any_of() {
        assert_eq!(bits_to_store_any_of::<u32>([]), 0);
        assert_eq!(bits_to_store_any_of([0u8]), 0);
        assert_eq!(bits_to_store_any_of([0u8, 1]), 1);
        assert_eq!(bits_to_store_any_of([2u8, 7, 3]), 3);
        assert_eq!(bits_to_store_any_of([u64::MAX, 2, 67]), 64);
    }

    #[test]
    fn builds_and_looks_up_an_mph_end_to_end() {
        let keys: Vec<Vec<u8>> = (0u32..1000).map(|i| i.to_le_bytes().to_vec()).collect();
        let opts = BuildOptions::new(Variant::Mph);
        let image = build(&keys, &[], &opts).expect("should build");

        let mut buf = Vec::new();
        dump(&image, &mut buf).expect("should dump");
        let loaded = load(&mut &buf[..]).expect("should load");

        let mut seen = vec![false; keys.len()];
        for k in &keys {
            let idx = lookup(&loaded, k);
            assert!(idx < keys.len() as u64);
            assert!(!seen[idx as usize]);
            seen[idx as usize] = true;
        }
        assert!(seen.iter().all(|&b| b));
        assert!(size_in_bits(&loaded) > 0);
    }
}
