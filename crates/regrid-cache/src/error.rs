//! Error types for kernels and the cache file tier.

use std::error::Error;
use std::fmt;
use std::io;

/// Errors from an interpolation kernel.
#[derive(Debug)]
pub enum KernelError {
    /// The kernel failed to compute weights or a mask.
    Failed {
        /// Name of the failing kernel or provider.
        kernel: String,
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The kernel does not support a representation it was given.
    Unsupported {
        /// Name of the kernel.
        kernel: String,
        /// Identifier of the unsupported representation.
        representation: String,
    },
    /// The kernel produced a matrix of the wrong shape.
    WrongShape {
        /// Name of the kernel.
        kernel: String,
        /// `(rows, cols)` the caller expected.
        expected: (usize, usize),
        /// `(rows, cols)` the kernel produced.
        actual: (usize, usize),
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { kernel, reason } => write!(f, "kernel '{kernel}' failed: {reason}"),
            Self::Unsupported {
                kernel,
                representation,
            } => write!(f, "kernel '{kernel}' does not support {representation}"),
            Self::WrongShape {
                kernel,
                expected,
                actual,
            } => write!(
                f,
                "kernel '{kernel}' produced a {}x{} matrix, expected {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
        }
    }
}

impl Error for KernelError {}

/// Errors from encoding, decoding, or persisting cache files.
///
/// These never escape the cache API: every decode failure degrades to a
/// cache miss and every write failure to a skipped persist, both logged.
#[derive(Debug)]
pub enum CacheError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The file content is not a valid cache entry (truncated, trailing
    /// bytes, negative counts, out-of-bounds indices).
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The entry decodes but its shape is not what the caller expects.
    ShapeMismatch {
        /// `(rows, cols)` the caller expected.
        expected: (usize, usize),
        /// `(rows, cols)` recorded in the file.
        found: (usize, usize),
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Malformed { detail } => write!(f, "malformed cache entry: {detail}"),
            Self::ShapeMismatch { expected, found } => write!(
                f,
                "cache entry is {}x{}, expected {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
