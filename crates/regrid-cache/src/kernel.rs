//! The numeric-kernel seam.
//!
//! Triangulation, neighbour search, and weight math live in external
//! libraries; the planning and caching layers reach them only through
//! [`InterpolationKernel`] and [`MaskProvider`]. The caches wrap these so
//! a kernel runs at most once per cache key per process.

use indexmap::IndexMap;
use std::sync::Arc;

use regrid_core::repres::Representation;

use crate::error::KernelError;
use crate::mask::Mask;
use crate::matrix::WeightMatrix;

/// Computes interpolation weight matrices for one method.
pub trait InterpolationKernel: Send + Sync {
    /// Canonical method name ("bilinear", "nearest", ...); the first
    /// segment of every weight cache key this kernel contributes to.
    fn name(&self) -> &str;

    /// Compute the weight matrix mapping `input` values to `output`
    /// values, optionally biased by land-sea masks.
    ///
    /// The result must have `output.point_count()` rows and
    /// `input.point_count()` columns.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError`] when the method cannot handle a
    /// representation or the computation fails.
    fn compute_weights(
        &self,
        input: &dyn Representation,
        output: &dyn Representation,
        input_mask: Option<&Mask>,
        output_mask: Option<&Mask>,
    ) -> Result<WeightMatrix, KernelError>;
}

/// Supplies land-sea masks for representations.
pub trait MaskProvider: Send + Sync {
    /// Stable identifier of this provider (dataset name, resolution).
    fn unique_id(&self) -> String;

    /// Compute the per-point mask for a representation.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError`] when the mask source cannot cover the
    /// representation.
    fn mask(&self, representation: &dyn Representation) -> Result<Vec<bool>, KernelError>;
}

/// Interpolation methods available to a process, by name.
///
/// Constructed once at startup and passed to whatever needs method
/// lookup; iteration order is registration order.
#[derive(Default)]
pub struct KernelRegistry {
    kernels: IndexMap<String, Arc<dyn InterpolationKernel>>,
}

impl KernelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kernel under its own name, replacing any previous
    /// kernel of that name.
    pub fn register(&mut self, kernel: Arc<dyn InterpolationKernel>) -> &mut Self {
        self.kernels.insert(kernel.name().to_string(), kernel);
        self
    }

    /// Look up a kernel by method name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn InterpolationKernel>> {
        self.kernels.get(name).cloned()
    }

    /// Registered method names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kernels.keys().map(|k| k.as_str())
    }
}
