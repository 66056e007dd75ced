//! Length-limited canonical Huffman coding over `u64` values, with an escape
//! codeword for distributions too wide to fit every value in `max_length`
//! bits, and a decoding table that recovers a value from a fixed-width
//! codeword without walking a tree.

mod frequencies;
mod package_merge;
mod coding;

pub use frequencies::Frequencies;
pub use package_merge::limited_lengths;
pub use coding::{Coding, Codeword, Decoded, DecodingTable, ESCAPE_SENTINEL};
