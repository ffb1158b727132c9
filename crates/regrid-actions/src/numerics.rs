//! The numeric-collaborator bundle and default action factories.

use std::sync::Arc;

use regrid_cache::{KernelRegistry, MaskCache, MaskProvider, WeightCache};
use regrid_core::param::Parametrisation;
use regrid_core::repres::{BoundingBox, RegularGaussian, RegularLatLon, Representation};
use regrid_plan::{ActionRegistry, PlanError};

use crate::crop::AreaCrop;
use crate::interpolate::Interpolate;
use crate::truncate::SpectralTruncate;

/// Everything the numeric actions share: the kernel registry, the
/// weight and mask caches, and an optional land-sea mask provider.
///
/// Constructed once at application start; the caches inside are the
/// process-wide memoization state, so one bundle is shared by every job.
pub struct Numerics {
    kernels: KernelRegistry,
    weights: WeightCache,
    masks: MaskCache,
    mask_provider: Option<Arc<dyn MaskProvider>>,
}

impl Numerics {
    /// Bundle the collaborators.
    pub fn new(
        kernels: KernelRegistry,
        weights: WeightCache,
        masks: MaskCache,
        mask_provider: Option<Arc<dyn MaskProvider>>,
    ) -> Self {
        Self {
            kernels,
            weights,
            masks,
            mask_provider,
        }
    }

    /// The interpolation methods available to this process.
    pub fn kernels(&self) -> &KernelRegistry {
        &self.kernels
    }

    /// The weight-matrix cache.
    pub fn weights(&self) -> &WeightCache {
        &self.weights
    }

    /// The land-sea mask cache.
    pub fn masks(&self) -> &MaskCache {
        &self.masks
    }

    /// The land-sea mask provider, if one is configured.
    pub fn mask_provider(&self) -> Option<&Arc<dyn MaskProvider>> {
        self.mask_provider.as_ref()
    }
}

/// Register the parametrisation-driven actions with `registry`.
///
/// - `"crop"` reads `area` (`[north, west, south, east]` degrees);
/// - `"truncate"` reads `truncation` (target wavenumber limit);
/// - `"interpolate"` reads `method` (a registered kernel name), one of
///   `grid` (`[west-east, north-south]` degree increments) or
///   `gaussian` (resolution `N`), and the `lsm` flag.
///
/// Missing or unusable parameters, and `method` names the kernel
/// registry does not know, surface as [`PlanError`] at plan-build time.
pub fn register_defaults(registry: &mut ActionRegistry, numerics: &Arc<Numerics>) {
    registry.register("crop", |params| {
        let area = require(params.as_ref(), "crop", "area", |p, k| p.get_double_list(k))?;
        let &[north, west, south, east] = &area[..] else {
            return Err(PlanError::InvalidParameter {
                action: "crop".to_string(),
                detail: format!("area has {} values, expected 4", area.len()),
            });
        };
        let area = BoundingBox::new(north, west, south, east).map_err(|e| {
            PlanError::InvalidParameter {
                action: "crop".to_string(),
                detail: e.to_string(),
            }
        })?;
        Ok(Box::new(AreaCrop::new(area)))
    });

    registry.register("truncate", |params| {
        let target = require(params.as_ref(), "truncate", "truncation", |p, k| {
            p.get_long(k)
        })?;
        let target = usize::try_from(target).map_err(|_| PlanError::InvalidParameter {
            action: "truncate".to_string(),
            detail: format!("truncation {target} is negative"),
        })?;
        Ok(Box::new(SpectralTruncate::new(target)))
    });

    let bundle = Arc::clone(numerics);
    registry.register("interpolate", move |params| {
        let method = require(params.as_ref(), "interpolate", "method", |p, k| {
            p.get_string(k)
        })?;
        let kernel = bundle
            .kernels()
            .get(&method)
            .ok_or_else(|| PlanError::InvalidParameter {
                action: "interpolate".to_string(),
                detail: format!("method '{method}' is not registered"),
            })?;
        let target = target_representation(params.as_ref())?;
        let lsm = params.get_bool("lsm").unwrap_or(false);
        Ok(Box::new(Interpolate::new(
            kernel,
            target,
            lsm,
            Arc::clone(&bundle),
        )))
    });
}

fn target_representation(
    params: &dyn Parametrisation,
) -> Result<Arc<dyn Representation>, PlanError> {
    if let Some(increments) = params.get_double_list("grid") {
        let &[we, ns] = &increments[..] else {
            return Err(PlanError::InvalidParameter {
                action: "interpolate".to_string(),
                detail: format!("grid has {} values, expected 2", increments.len()),
            });
        };
        let grid = RegularLatLon::from_increments(we, ns, BoundingBox::GLOBAL).map_err(|e| {
            PlanError::InvalidParameter {
                action: "interpolate".to_string(),
                detail: e.to_string(),
            }
        })?;
        return Ok(Arc::new(grid));
    }
    if let Some(n) = params.get_long("gaussian") {
        let n = usize::try_from(n).map_err(|_| PlanError::InvalidParameter {
            action: "interpolate".to_string(),
            detail: format!("gaussian resolution {n} is negative"),
        })?;
        let grid = RegularGaussian::new(n).map_err(|e| PlanError::InvalidParameter {
            action: "interpolate".to_string(),
            detail: e.to_string(),
        })?;
        return Ok(Arc::new(grid));
    }
    Err(PlanError::MissingParameter {
        action: "interpolate".to_string(),
        key: "grid".to_string(),
    })
}

fn require<T>(
    params: &dyn Parametrisation,
    action: &str,
    key: &str,
    get: impl Fn(&dyn Parametrisation, &str) -> Option<T>,
) -> Result<T, PlanError> {
    get(params, key).ok_or_else(|| PlanError::MissingParameter {
        action: action.to_string(),
        key: key.to_string(),
    })
}
