//! Error types for plan building and execution.

use std::error::Error;
use std::fmt;

use regrid_core::error::{FieldError, SinkError, SourceError};

/// Errors detected while building a plan.
///
/// These are configuration errors: fatal, surfaced to the caller before
/// any I/O or computation happens, never retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanError {
    /// No action of this name is registered.
    UnknownAction {
        /// The unrecognized name.
        name: String,
    },
    /// A registered action could not be built because a required
    /// parameter is absent.
    MissingParameter {
        /// Name of the action being built.
        action: String,
        /// The missing parameter key.
        key: String,
    },
    /// A parameter is present but unusable.
    InvalidParameter {
        /// Name of the action being built.
        action: String,
        /// Human-readable description of the problem.
        detail: String,
    },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAction { name } => write!(f, "unknown action '{name}'"),
            Self::MissingParameter { action, key } => {
                write!(f, "action '{action}' requires parameter '{key}'")
            }
            Self::InvalidParameter { action, detail } => {
                write!(f, "action '{action}': {detail}")
            }
        }
    }
}

impl Error for PlanError {}

/// Errors raised by an [`Action`](crate::action::Action) mid-execution.
#[derive(Debug)]
pub enum ActionError {
    /// The input field could not be read.
    Source(SourceError),
    /// The output field could not be written.
    Sink(SinkError),
    /// A field operation failed.
    Field(FieldError),
    /// The action could not be applied to the field it was given.
    Failed {
        /// Name of the failing action.
        action: String,
        /// Human-readable description of the failure.
        detail: String,
    },
    /// An external numeric collaborator failed.
    Kernel {
        /// Name of the failing action.
        action: String,
        /// The collaborator's error.
        source: Box<dyn Error + Send + Sync>,
    },
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(e) => e.fmt(f),
            Self::Sink(e) => e.fmt(f),
            Self::Field(e) => e.fmt(f),
            Self::Failed { action, detail } => write!(f, "action '{action}' failed: {detail}"),
            Self::Kernel { action, source } => {
                write!(f, "action '{action}' kernel failure: {source}")
            }
        }
    }
}

impl Error for ActionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source(e) => Some(e),
            Self::Sink(e) => Some(e),
            Self::Field(e) => Some(e),
            Self::Failed { .. } => None,
            Self::Kernel { source, .. } => Some(source.as_ref()),
        }
    }
}

impl From<SourceError> for ActionError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

impl From<SinkError> for ActionError {
    fn from(e: SinkError) -> Self {
        Self::Sink(e)
    }
}

impl From<FieldError> for ActionError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

/// An action failure that propagated out of a plan or graph traversal.
///
/// Carries the failing action's rendered description so the ultimate
/// caller can report which step broke without holding the action itself.
#[derive(Debug)]
pub struct ExecutionError {
    action: String,
    error: ActionError,
}

impl ExecutionError {
    /// Wrap an action failure.
    pub fn new(action: &dyn crate::action::Action, error: ActionError) -> Self {
        Self {
            action: action.to_string(),
            error,
        }
    }

    /// Wrap a failure raised outside any action, labelled with the
    /// stage that raised it (e.g. reading the shared input).
    pub fn at_stage(stage: &str, error: ActionError) -> Self {
        Self {
            action: stage.to_string(),
            error,
        }
    }

    /// Rendered description of the failing action.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The underlying action error.
    pub fn error(&self) -> &ActionError {
        &self.error
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.action, self.error)
    }
}

impl Error for ExecutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}
