//! Build-time configuration. A plain struct passed explicitly into
//! [`crate::builder::build`] — no ambient globals, no environment reads.

/// Which of the three succinct-function families to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Minimal perfect hash: no values stored, just a bijection onto
    /// `[0, n)`.
    Mph,
    /// Static function: every key maps to a `bit_width`-bit value (1..=64).
    Sf { bit_width: u8 },
    /// Compressed static function: values are drawn from a skewed
    /// distribution and coded with a length-limited canonical Huffman code.
    Csf { max_codeword_length: u8 },
}

impl Variant {
    /// Vertex-budget multiplier: `V(β) = ⌈c·k(β)⌉`. MPH's `c` is not a tunable
    /// slack but the threshold peeling itself needs — a random 3-uniform
    /// hypergraph's 2-core is empty w.h.p. only once `k/V` drops below
    /// `~0.818`, i.e. `V ≳ 1.23·k`; below that, [`crate::peeler::peel`] leaves
    /// a non-empty 2-core on essentially every attempt and every bucket
    /// exhausts its retries. SF/CSF have no peeling-emptiness requirement of
    /// their own (the F₂ solver's dense fallback handles a non-empty 2-core),
    /// so their constants stay modest slack for solvability margin.
    pub(crate) fn expansion_constant(&self) -> f64 {
        match self {
            Variant::Mph => 1.23,
            Variant::Sf { .. } => 1.10,
            Variant::Csf { .. } => 1.10,
        }
    }

    pub(crate) fn default_bucket_size(&self) -> usize {
        match self {
            Variant::Mph => 1500,
            Variant::Sf { .. } => 1200,
            Variant::Csf { .. } => 800,
        }
    }

    /// Width of the low (offset) bits of an [`crate::image::Image`]'s packed
    /// offset-and-seed entries: 56 for MPH/SF, 54 for CSF (§6.1, §9 Open
    /// Question 2 — `DESIGN.md` records this as a self-describing per-image
    /// field rather than a hardcoded mask, but these are the defaults used
    /// when building).
    pub(crate) fn offset_bits(&self) -> u8 {
        match self {
            Variant::Mph | Variant::Sf { .. } => 56,
            Variant::Csf { .. } => 54,
        }
    }
}

/// Configuration for [`crate::builder::build`].
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Seed for the first global attempt. Later attempts derive from it
    /// deterministically (see [`BuildOptions::attempt_seed`]).
    pub global_seed: u64,
    /// Per-bucket retries (fresh local seed each time) before the bucket is
    /// reported as failed to the outer loop.
    pub max_attempts_per_bucket: u32,
    /// Outer attempts (fresh global seed, re-bucketing everything) before
    /// giving up entirely.
    pub max_global_attempts: u32,
    /// Average signatures per bucket. `None` uses the variant's default.
    pub bucket_size_hint: Option<usize>,
    /// Whether to scan for two distinct keys sharing a signature before
    /// building (§7 `DuplicateKey`). Expensive on large key sets; on by
    /// default since a silent collision is undefined behaviour downstream.
    pub duplicate_key_check: bool,
    pub variant: Variant,
}

impl BuildOptions {
    pub fn new(variant: Variant) -> Self {
        Self {
            global_seed: 0x9e3779b97f4a7c13,
            max_attempts_per_bucket: 256,
            max_global_attempts: 3,
            bucket_size_hint: None,
            duplicate_key_check: true,
            variant,
        }
    }

    pub(crate) fn bucket_size(&self) -> usize {
        self.bucket_size_hint.unwrap_or_else(|| self.variant.default_bucket_size())
    }

    /// Deterministic per-global-attempt seed, so retries are reproducible
    /// given the same `global_seed`.
    pub(crate) fn attempt_seed(&self, attempt: u32) -> u64 {
        self.global_seed ^ (attempt as u64).wrapping_mul(0x9e3779b97f4a7c13)
    }
}
