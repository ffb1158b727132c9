//! Test-only fixtures local to this crate.
//!
//! Kept here rather than pulled from `regrid-test-utils`, since that
//! crate depends on `regrid-plan`: using it from this crate's own unit
//! tests would form a dev-dependency cycle.

use std::any::Any;
use std::fmt;

use crate::action::Action;
use crate::context::Context;
use crate::error::ActionError;

/// An [`Action`] that does nothing; equivalence is by tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NoopAction {
    tag: String,
}

impl NoopAction {
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
        }
    }
}

impl fmt::Display for NoopAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Noop[tag={}]", self.tag)
    }
}

impl Action for NoopAction {
    fn name(&self) -> &str {
        "noop"
    }

    fn execute(&self, _context: &mut Context) -> Result<(), ActionError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn Action) -> bool {
        other.as_any().downcast_ref::<Self>() == Some(self)
    }
}
