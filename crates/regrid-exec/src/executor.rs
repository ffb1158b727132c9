//! Execution strategy selection.

use regrid_plan::{ActionGraph, Context, ExecutionError};

use crate::pool;

/// How an action graph's nodes are scheduled.
///
/// Chosen per request, not hard-coded: the same graph runs under either
/// strategy with identical failure semantics. Parallelism only exists
/// at branch points: the shared prefix of any two plans executes once,
/// serially, before any fan-out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Executor {
    /// Execute synchronously on the calling thread.
    Immediate,
    /// Fan branches out across a bounded worker pool and block the
    /// caller until the pool drains.
    Pooled {
        /// Number of worker threads (at least one is used).
        workers: usize,
    },
}

impl Executor {
    /// Execute `graph` to completion under this strategy.
    ///
    /// # Errors
    ///
    /// Returns the first propagating [`ExecutionError`]; watcher-vetoed
    /// failures stop their branch without surfacing here.
    pub fn execute(&self, graph: &ActionGraph, context: Context) -> Result<(), ExecutionError> {
        match self {
            Self::Immediate => graph.execute(context),
            Self::Pooled { workers } => pool::execute(graph, context, *workers),
        }
    }
}
