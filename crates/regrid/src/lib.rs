//! Regrid: plan scheduling and result caching for geospatial field
//! regridding.
//!
//! This is the top-level facade crate re-exporting the public API from
//! all Regrid sub-crates. For most users, adding `regrid` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use regrid::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! // A source handing out a small global grid, a sink counting writes.
//! struct VecSource(Field);
//! impl FieldSource for VecSource {
//!     fn metadata(&self) -> Result<ParamMap, SourceError> {
//!         Ok(self.0.metadata().clone())
//!     }
//!     fn read(&self) -> Result<Field, SourceError> {
//!         Ok(self.0.clone())
//!     }
//! }
//! struct VecSink(Mutex<usize>);
//! impl FieldSink for VecSink {
//!     fn write(&self, _field: &Field, _accuracy: Option<i64>) -> Result<(), SinkError> {
//!         *self.0.lock().unwrap() += 1;
//!         Ok(())
//!     }
//! }
//!
//! let grid = RegularLatLon::new(3, 3, BoundingBox::GLOBAL).unwrap();
//! let field = Field::new(Arc::new(grid), vec![0.0; 9], ParamMap::new()).unwrap();
//!
//! // The process-wide numeric bundle: kernels, caches, mask provider.
//! let numerics = Arc::new(Numerics::new(
//!     KernelRegistry::new(),
//!     WeightCache::in_memory(),
//!     MaskCache::in_memory(),
//!     None,
//! ));
//! let mut registry = ActionRegistry::new();
//! register_defaults(&mut registry, &numerics);
//!
//! // An empty request degenerates to a pure copy.
//! let source = Arc::new(VecSource(field));
//! let sink = Arc::new(VecSink(Mutex::new(0)));
//! let job = Job::new(
//!     ParamMap::new(),
//!     source,
//!     sink.clone(),
//!     &registry,
//!     &DefaultPlanner,
//!     Arc::new(ParamMap::new()),
//! )
//! .unwrap();
//!
//! let statistics = job.execute().unwrap();
//! assert_eq!(*sink.0.lock().unwrap(), 1);
//! assert_eq!(statistics.fields_written, 1);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `regrid-core` | parametrisation, fields, representations, collaborator traits |
//! | [`cache`] | `regrid-cache` | weight matrices, masks, cache keys, the weight/mask caches |
//! | [`plan`] | `regrid-plan` | the action contract, plans, the action graph, watchers |
//! | [`actions`] | `regrid-actions` | reference actions and the `Numerics` bundle |
//! | [`exec`] | `regrid-exec` | executors, planners, jobs, batches |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and collaborator traits (`regrid-core`).
pub use regrid_core as types;

/// Weight matrices, masks, and the caches (`regrid-cache`).
pub use regrid_cache as cache;

/// Plans and the action graph (`regrid-plan`).
pub use regrid_plan as plan;

/// Reference actions and the numeric bundle (`regrid-actions`).
pub use regrid_actions as actions;

/// Executors, planners, jobs, and batches (`regrid-exec`).
pub use regrid_exec as exec;

/// The most commonly used types, in one import.
pub mod prelude {
    pub use regrid_actions::{register_defaults, AreaCrop, CopyField, Interpolate, Numerics, Save, SpectralTruncate};
    pub use regrid_cache::{
        CacheKey, CacheStatistics, InterpolationKernel, KernelRegistry, Mask, MaskCache,
        MaskProvider, WeightCache, WeightMatrix,
    };
    pub use regrid_core::error::{SinkError, SourceError};
    pub use regrid_core::field::Field;
    pub use regrid_core::param::{Merged, ParamMap, Parametrisation, Value};
    pub use regrid_core::repres::{
        BoundingBox, RegularGaussian, RegularLatLon, Representation, SphericalHarmonics,
    };
    pub use regrid_core::stats::Statistics;
    pub use regrid_core::traits::{FieldSink, FieldSource};
    pub use regrid_exec::{
        Batch, BatchReport, ConfigError, DefaultPlanner, Executor, Job, JobError, JobOutcome,
        Planner,
    };
    pub use regrid_plan::{
        Action, ActionError, ActionGraph, ActionPlan, ActionRegistry, Context, ExecutionError,
        PlanError, Watcher,
    };
}
