//! Many jobs, one graph, one traversal.

use std::sync::{Arc, Mutex, PoisonError};

use regrid_core::stats::Statistics;
use regrid_core::traits::FieldSource;
use regrid_plan::{Action, ActionError, ActionGraph, Context, Watcher};

use crate::executor::Executor;
use crate::job::Job;

/// How one job in a batch ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// Every action on the job's path completed.
    Completed,
    /// An action on the job's path failed.
    Failed {
        /// Rendered `"<action> | <error>"` description of the failure.
        detail: String,
    },
}

/// The result of one batch traversal.
#[derive(Clone, Debug)]
pub struct BatchReport {
    /// Per-job outcomes, in absorption order.
    pub outcomes: Vec<JobOutcome>,
    /// Statistics accumulated across the whole traversal.
    pub statistics: Statistics,
}

/// Records its job's failure and vetoes propagation, so sibling jobs
/// in the batch keep running.
#[derive(Default)]
struct OutcomeWatcher {
    failure: Mutex<Option<String>>,
}

impl OutcomeWatcher {
    fn take(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Watcher for OutcomeWatcher {
    fn failure(&self, error: &ActionError, action: &dyn Action) -> bool {
        let mut slot = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(format!("{action} | {error}"));
        }
        false
    }
}

/// Absorbs many jobs into one shared [`ActionGraph`] and executes them
/// as a single traversal.
///
/// Jobs in one batch read the same logical input; the first absorbed
/// job's source feeds the traversal. The shared prefix of any two
/// plans executes once, and a failing job is reported in its outcome
/// without aborting its siblings.
#[derive(Default)]
pub struct Batch {
    graph: ActionGraph,
    source: Option<Arc<dyn FieldSource>>,
    watchers: Vec<Arc<OutcomeWatcher>>,
}

impl Batch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb a job's plan into the shared graph.
    pub fn absorb(&mut self, job: Job) {
        let watcher = Arc::new(OutcomeWatcher::default());
        self.watchers.push(Arc::clone(&watcher));
        let source = job.absorb_into(&mut self.graph, Some(watcher));
        self.source.get_or_insert(source);
    }

    /// Number of absorbed jobs.
    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    /// Whether no job has been absorbed yet.
    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// The shared graph.
    pub fn graph(&self) -> &ActionGraph {
        &self.graph
    }

    /// Execute the shared graph under `executor` and report per-job
    /// outcomes.
    ///
    /// Job failures are captured by each job's watcher and reported in
    /// the outcomes rather than returned; the traversal itself only
    /// fails on a propagating error from a path no job is watching.
    pub fn execute(&self, executor: &Executor) -> Result<BatchReport, regrid_plan::ExecutionError> {
        let statistics = Arc::new(Mutex::new(Statistics::new()));
        if let Some(source) = &self.source {
            let mut context = Context::with_source(Arc::clone(source), Arc::clone(&statistics));
            // Read the shared input once, before any fan-out; every
            // branch clones the field state instead of re-reading.
            context
                .materialize()
                .map_err(|e| regrid_plan::ExecutionError::at_stage("input", e))?;
            executor.execute(&self.graph, context)?;
        }
        let outcomes = self
            .watchers
            .iter()
            .map(|watcher| match watcher.take() {
                Some(detail) => JobOutcome::Failed { detail },
                None => JobOutcome::Completed,
            })
            .collect();
        let statistics = statistics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(BatchReport {
            outcomes,
            statistics,
        })
    }
}
