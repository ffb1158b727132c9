//! One request, one input, one output.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use regrid_core::param::{Merged, ParamMap, Parametrisation};
use regrid_core::stats::Statistics;
use regrid_core::traits::{FieldSink, FieldSource};
use regrid_plan::{ActionGraph, ActionPlan, ActionRegistry, Context, Watcher};

use crate::error::{ConfigError, JobError};
use crate::planner::Planner;

/// Request options that must not be combined.
const EXCLUSIVE_OPTIONS: &[(&str, &str)] = &[("grid", "gaussian")];

/// One regridding request bound to its input source and output sink.
///
/// Construction validates the request, merges it with the input's
/// metadata and the process defaults (request wins over metadata wins
/// over defaults), and builds the plan, so every configuration error
/// surfaces here, before any field is read or written.
pub struct Job {
    plan: ActionPlan,
    source: Arc<dyn FieldSource>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").finish()
    }
}

impl Job {
    /// Validate `request` and plan its execution.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an internally inconsistent request,
    /// [`SourceError`](regrid_core::error::SourceError) when the input's
    /// metadata cannot be read, and [`PlanError`](regrid_plan::PlanError)
    /// when the planner cannot build an action.
    pub fn new(
        request: ParamMap,
        source: Arc<dyn FieldSource>,
        sink: Arc<dyn FieldSink>,
        registry: &ActionRegistry,
        planner: &dyn Planner,
        defaults: Arc<ParamMap>,
    ) -> Result<Self, JobError> {
        for (first, second) in EXCLUSIVE_OPTIONS {
            if request.has(first) && request.has(second) {
                return Err(ConfigError::ExclusiveOptions {
                    first: (*first).to_string(),
                    second: (*second).to_string(),
                }
                .into());
            }
        }

        let metadata = source.metadata()?;
        let merged = Merged::new(request, metadata, defaults);
        let plan = planner.plan(&merged, registry, sink)?;
        debug!(plan = %plan, "job planned");
        Ok(Self { plan, source })
    }

    /// The job's plan.
    pub fn plan(&self) -> &ActionPlan {
        &self.plan
    }

    /// Run the plan on the calling thread: exactly one read of the
    /// input, exactly one write to the output.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Execution`] when an action fails; the sink is
    /// only written by the terminal step, after everything before it
    /// succeeded.
    pub fn execute(&self) -> Result<Statistics, JobError> {
        let statistics = Arc::new(Mutex::new(Statistics::new()));
        let mut context = Context::with_source(Arc::clone(&self.source), Arc::clone(&statistics));
        self.plan.execute(&mut context)?;
        let statistics = statistics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(statistics)
    }

    /// Hand the plan (and this job's watcher) to a shared graph.
    ///
    /// Returns the job's source: the graph traversal reads the shared
    /// input through it.
    pub fn absorb_into(
        self,
        graph: &mut ActionGraph,
        watcher: Option<Arc<dyn Watcher>>,
    ) -> Arc<dyn FieldSource> {
        graph.add(self.plan, watcher);
        self.source
    }
}
