//! Weight matrices, the interpolation-kernel seam, and the caches.
//!
//! Computing an interpolation weight matrix is the expensive part of
//! regridding; the matrix itself is just a sparse linear operator that can
//! be reused for every field moving between the same pair of grids. This
//! crate holds the matrix and mask value types, the binary file codec, the
//! deterministic cache key, and the two-tier (in-memory + on-disk)
//! [`WeightCache`] and [`MaskCache`] with an at-most-one-computation-per-key
//! guarantee.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod codec;
pub mod error;
pub mod kernel;
pub mod key;
pub mod mask;
pub mod matrix;
mod store;

pub use cache::{CacheStatistics, MaskCache, WeightCache};
pub use error::{CacheError, KernelError};
pub use kernel::{InterpolationKernel, KernelRegistry, MaskProvider};
pub use key::CacheKey;
pub use mask::Mask;
pub use matrix::{Triplet, WeightMatrix};
