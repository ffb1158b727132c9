//! Interpolate a field onto another grid.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use regrid_cache::{CacheKey, InterpolationKernel, KernelError, Mask};
use regrid_core::repres::Representation;
use regrid_plan::{Action, ActionError, Context};

use crate::numerics::Numerics;

/// Map the field's values onto a target representation through a sparse
/// weight matrix.
///
/// The matrix comes from the weight cache; the kernel only runs on a
/// cache miss, at most once per key per process. With `lsm` active the
/// input and output land-sea masks (themselves cached) are handed to the
/// kernel and become part of the weight key.
pub struct Interpolate {
    kernel: Arc<dyn InterpolationKernel>,
    target: Arc<dyn Representation>,
    lsm: bool,
    numerics: Arc<Numerics>,
}

impl Interpolate {
    /// Interpolate with `kernel` onto `target`.
    pub fn new(
        kernel: Arc<dyn InterpolationKernel>,
        target: Arc<dyn Representation>,
        lsm: bool,
        numerics: Arc<Numerics>,
    ) -> Self {
        Self {
            kernel,
            target,
            lsm,
            numerics,
        }
    }

    fn mask_for(&self, repres: &dyn Representation) -> Result<Option<Arc<Mask>>, ActionError> {
        if !self.lsm {
            return Ok(None);
        }
        let provider = self
            .numerics
            .mask_provider()
            .ok_or_else(|| ActionError::Failed {
                action: "interpolate".to_string(),
                detail: "lsm requested but no mask provider configured".to_string(),
            })?;
        let key = CacheKey::mask(&provider.unique_id(), repres);
        let mask = self
            .numerics
            .masks()
            .get_or_compute(&key, repres.point_count(), || {
                provider
                    .mask(repres)
                    .map(|points| Mask::new(key.as_str(), points))
            })
            .map_err(|e| ActionError::Kernel {
                action: "interpolate".to_string(),
                source: Box::new(e),
            })?;
        Ok(Some(mask))
    }
}

impl fmt::Display for Interpolate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Interpolate[method={},target={}",
            self.kernel.name(),
            self.target.unique_id()
        )?;
        if self.lsm {
            write!(f, ",lsm")?;
        }
        write!(f, "]")
    }
}

impl Action for Interpolate {
    fn name(&self) -> &str {
        "interpolate"
    }

    fn execute(&self, context: &mut Context) -> Result<(), ActionError> {
        let input = Arc::clone(context.field_mut()?.representation());
        let input_mask = self.mask_for(input.as_ref())?;
        let output_mask = self.mask_for(self.target.as_ref())?;
        let key = CacheKey::weights(
            self.kernel.name(),
            input.as_ref(),
            self.target.as_ref(),
            input_mask.as_deref(),
            output_mask.as_deref(),
        );
        let expected = (self.target.point_count(), input.point_count());
        debug!(key = %key, rows = expected.0, cols = expected.1, "interpolating");

        let matrix = self
            .numerics
            .weights()
            .get_or_compute(&key, expected, || {
                let matrix = self.kernel.compute_weights(
                    input.as_ref(),
                    self.target.as_ref(),
                    input_mask.as_deref(),
                    output_mask.as_deref(),
                )?;
                if (matrix.rows(), matrix.cols()) != expected {
                    return Err(KernelError::WrongShape {
                        kernel: self.kernel.name().to_string(),
                        expected,
                        actual: (matrix.rows(), matrix.cols()),
                    });
                }
                Ok(matrix)
            })
            .map_err(|e| ActionError::Kernel {
                action: "interpolate".to_string(),
                source: Box::new(e),
            })?;

        let field = context.field_mut()?;
        let values = matrix
            .apply(field.values())
            .ok_or_else(|| ActionError::Failed {
                action: "interpolate".to_string(),
                detail: format!(
                    "field has {} values, weight matrix has {} columns",
                    field.values().len(),
                    matrix.cols()
                ),
            })?;
        field.replace(Arc::clone(&self.target), values)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn Action) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|other| {
            self.kernel.name() == other.kernel.name()
                && self.target.same_as(other.target.as_ref())
                && self.lsm == other.lsm
        })
    }
}
