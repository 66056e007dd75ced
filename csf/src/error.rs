//! Error taxonomy for the builder and image loader. The lookup path has no
//! errors: it never panics and is total over `[0, 2^64)` key byte strings.

use std::fmt;

/// Surfaced to the caller of [`crate::builder::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// Every attempt for this bucket was exhausted (peeling or the F2
    /// system kept failing). The caller may retry with a fresh global seed.
    BuildFailed { bucket: usize },
    /// All global (outer) attempts were exhausted. Extremely rare in
    /// practice; usually indicates a pathological key set.
    BuildFailedGlobal,
    /// Two distinct keys produced the same 256-bit signature (detected by
    /// sorting signatures and scanning for equal neighbours).
    DuplicateKey,
    /// The builder's cooperative cancellation check fired between buckets.
    Cancelled,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::BuildFailed { bucket } => write!(f, "bucket {bucket} exhausted its attempt budget"),
            BuildError::BuildFailedGlobal => write!(f, "exhausted all global attempts"),
            BuildError::DuplicateKey => write!(f, "two distinct keys hashed to the same signature"),
            BuildError::Cancelled => write!(f, "build was cancelled"),
        }
    }
}

impl std::error::Error for BuildError {}

/// Surfaced by [`crate::image::load`].
#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    /// The image does not parse: wrong size, unknown variant tag, or a
    /// truncated array.
    Format(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "I/O error: {e}"),
            LoadError::Format(msg) => write!(f, "malformed image: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Format(_) => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self { LoadError::Io(e) }
}
