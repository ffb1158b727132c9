//! The mutable state passed down a plan or graph traversal.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use regrid_core::field::Field;
use regrid_core::stats::Statistics;
use regrid_core::traits::FieldSource;

use crate::error::ActionError;

/// A field in flight plus shared execution statistics.
///
/// The field is read lazily from the source on first access, so a plan
/// that degenerates to nothing never touches the input. Statistics are
/// shared: branching a context copies the field state but keeps the same
/// statistics handle, so totals describe the whole traversal.
pub struct Context {
    source: Option<Arc<dyn FieldSource>>,
    field: Option<Field>,
    statistics: Arc<Mutex<Statistics>>,
}

impl Context {
    /// A context that reads its field from `source` on first access.
    pub fn with_source(source: Arc<dyn FieldSource>, statistics: Arc<Mutex<Statistics>>) -> Self {
        Self {
            source: Some(source),
            field: None,
            statistics,
        }
    }

    /// A context over an already materialized field.
    pub fn with_field(field: Field, statistics: Arc<Mutex<Statistics>>) -> Self {
        Self {
            source: None,
            field: Some(field),
            statistics,
        }
    }

    /// The field, reading it from the source on first call.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Source`] when the read fails, and
    /// [`ActionError::Failed`] when the context was built with neither a
    /// field nor a source.
    pub fn field_mut(&mut self) -> Result<&mut Field, ActionError> {
        if self.field.is_none() {
            let source = self.source.as_ref().ok_or_else(|| ActionError::Failed {
                action: "context".to_string(),
                detail: "no input bound".to_string(),
            })?;
            let field = source.read()?;
            self.lock().record_read();
            self.field = Some(field);
        }
        Ok(self.field.as_mut().expect("field populated above"))
    }

    /// The field, if it has been materialized.
    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    /// Read the field now rather than at first access.
    ///
    /// A traversal that will branch at the root calls this first, so
    /// the input is read once and every branch clones the field state.
    ///
    /// # Errors
    ///
    /// As [`field_mut`](Context::field_mut).
    pub fn materialize(&mut self) -> Result<(), ActionError> {
        self.field_mut().map(|_| ())
    }

    /// An independent copy for a sibling branch.
    ///
    /// The field state is cloned (sibling branches never observe each
    /// other's mutations); the statistics handle is shared.
    pub fn branch(&self) -> Context {
        Self {
            source: self.source.clone(),
            field: self.field.clone(),
            statistics: Arc::clone(&self.statistics),
        }
    }

    /// The shared statistics handle.
    pub fn statistics(&self) -> &Arc<Mutex<Statistics>> {
        &self.statistics
    }

    /// Record one completed action.
    pub fn record_action(&self, name: &str, elapsed: Duration) {
        self.lock().record_action(name, elapsed);
    }

    /// Record one field write.
    pub fn record_write(&self) {
        self.lock().record_write();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Statistics> {
        self.statistics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
