//! The degenerate copy step.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use regrid_core::traits::FieldSink;
use regrid_plan::{Action, ActionError, Context};

/// Pass the input through to the sink untransformed.
///
/// The planner emits this when a request needs no regridding at all;
/// the job still performs exactly one read and one write.
pub struct CopyField {
    sink: Arc<dyn FieldSink>,
}

impl CopyField {
    /// Copy to `sink`.
    pub fn new(sink: Arc<dyn FieldSink>) -> Self {
        Self { sink }
    }
}

impl fmt::Display for CopyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Copy[]")
    }
}

impl Action for CopyField {
    fn name(&self) -> &str {
        "copy"
    }

    fn execute(&self, context: &mut Context) -> Result<(), ActionError> {
        let field = context.field_mut()?;
        self.sink.write(field, None)?;
        context.record_write();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn Action) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| Arc::ptr_eq(&self.sink, &other.sink))
    }
}
