//! Error types for job construction and execution.

use std::error::Error;
use std::fmt;

use regrid_core::error::SourceError;
use regrid_plan::{ExecutionError, PlanError};

/// An internally inconsistent request.
///
/// Raised before any plan is built, any input is read, or any output is
/// touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Two mutually exclusive request options are both set.
    ExclusiveOptions {
        /// The first of the clashing options.
        first: String,
        /// The second of the clashing options.
        second: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExclusiveOptions { first, second } => {
                write!(f, "options '{first}' and '{second}' are mutually exclusive")
            }
        }
    }
}

impl Error for ConfigError {}

/// Errors from building or running a [`Job`](crate::job::Job).
#[derive(Debug)]
pub enum JobError {
    /// The request is internally inconsistent.
    Config(ConfigError),
    /// The planner could not build the action sequence.
    Plan(PlanError),
    /// The input's metadata could not be read.
    Source(SourceError),
    /// An action failed while the plan was executing.
    Execution(ExecutionError),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Plan(e) => e.fmt(f),
            Self::Source(e) => e.fmt(f),
            Self::Execution(e) => e.fmt(f),
        }
    }
}

impl Error for JobError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Plan(e) => Some(e),
            Self::Source(e) => Some(e),
            Self::Execution(e) => Some(e),
        }
    }
}

impl From<ConfigError> for JobError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<PlanError> for JobError {
    fn from(e: PlanError) -> Self {
        Self::Plan(e)
    }
}

impl From<SourceError> for JobError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

impl From<ExecutionError> for JobError {
    fn from(e: ExecutionError) -> Self {
        Self::Execution(e)
    }
}
