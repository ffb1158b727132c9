//! Execution statistics.

use indexmap::IndexMap;
use std::fmt;
use std::time::Duration;

/// Counters and timings accumulated while a plan or graph executes.
///
/// One `Statistics` value is shared by every branch of a traversal (the
/// field state is branched, the statistics are not), so the totals describe
/// the whole request batch.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    /// Fields decoded from sources.
    pub fields_read: usize,
    /// Fields written to sinks.
    pub fields_written: usize,
    /// Actions that ran to completion.
    pub actions_executed: usize,
    /// Wall-clock time per action name, summed over invocations.
    pub action_elapsed: IndexMap<String, Duration>,
}

impl Statistics {
    /// Fresh, all-zero statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed action.
    pub fn record_action(&mut self, name: &str, elapsed: Duration) {
        self.actions_executed += 1;
        *self
            .action_elapsed
            .entry(name.to_string())
            .or_insert(Duration::ZERO) += elapsed;
    }

    /// Record one field read.
    pub fn record_read(&mut self) {
        self.fields_read += 1;
    }

    /// Record one field write.
    pub fn record_write(&mut self) {
        self.fields_written += 1;
    }

    /// Total time spent inside actions.
    pub fn total_elapsed(&self) -> Duration {
        self.action_elapsed.values().sum()
    }

    /// Fold another statistics value into this one.
    pub fn merge(&mut self, other: &Statistics) {
        self.fields_read += other.fields_read;
        self.fields_written += other.fields_written;
        self.actions_executed += other.actions_executed;
        for (name, elapsed) in &other.action_elapsed {
            *self
                .action_elapsed
                .entry(name.clone())
                .or_insert(Duration::ZERO) += *elapsed;
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reads={} writes={} actions={}",
            self.fields_read, self.fields_written, self.actions_executed
        )?;
        for (name, elapsed) in &self.action_elapsed {
            write!(f, " {name}={elapsed:?}")?;
        }
        Ok(())
    }
}
