//! The terminal save step.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use regrid_core::traits::FieldSink;
use regrid_plan::{Action, ActionError, Context};

/// Write the field to a sink, optionally repacking at a requested
/// accuracy.
///
/// Equivalence compares the sink *handle*: two saves are one node only
/// when they write the same sink with the same accuracy, so two jobs
/// with their own outputs always keep their own terminal step.
pub struct Save {
    sink: Arc<dyn FieldSink>,
    accuracy: Option<i64>,
}

impl Save {
    /// Save to `sink`; `accuracy` in bits per value, `None` keeps the
    /// input packing.
    pub fn new(sink: Arc<dyn FieldSink>, accuracy: Option<i64>) -> Self {
        Self { sink, accuracy }
    }
}

impl fmt::Display for Save {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.accuracy {
            Some(accuracy) => write!(f, "Save[accuracy={accuracy}]"),
            None => write!(f, "Save[]"),
        }
    }
}

impl Action for Save {
    fn name(&self) -> &str {
        "save"
    }

    fn execute(&self, context: &mut Context) -> Result<(), ActionError> {
        let field = context.field_mut()?;
        self.sink.write(field, self.accuracy)?;
        context.record_write();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn Action) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|other| {
            Arc::ptr_eq(&self.sink, &other.sink) && self.accuracy == other.accuracy
        })
    }
}
