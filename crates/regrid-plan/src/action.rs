//! The [`Action`] contract.

use std::any::Any;
use std::fmt;

use crate::context::Context;
use crate::error::ActionError;

/// One named, parametrized transformation step in a regridding pipeline.
///
/// An action's identity is its concrete kind plus the parameters that
/// affect its behavior, snapshotted at construction. Execution mutates
/// the [`Context`] only; any I/O goes through collaborators the action
/// captured when it was built.
///
/// # Equivalence
///
/// [`same_as`](Action::same_as) is the deduplication key of the action
/// graph: two plans whose leading steps are pairwise `same_as` share
/// those steps' nodes. It must be total, reflexive, and symmetric, and
/// must return `false` across different concrete kinds. The conventional
/// implementation downcasts through [`as_any`](Action::as_any):
///
/// ```ignore
/// fn same_as(&self, other: &dyn Action) -> bool {
///     other.as_any().downcast_ref::<Self>() == Some(self)
/// }
/// ```
pub trait Action: fmt::Display + Send + Sync {
    /// Stable kind name ("crop", "interpolate", ...), used for statistics
    /// and logging.
    fn name(&self) -> &str;

    /// Apply the step to the context's field and statistics.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] when the step cannot be applied; the
    /// context may have consumed its input but the field is left in a
    /// consistent state.
    fn execute(&self, context: &mut Context) -> Result<(), ActionError>;

    /// Downcast support for [`same_as`](Action::same_as).
    fn as_any(&self) -> &dyn Any;

    /// Value equality restricted to the concrete kind.
    fn same_as(&self, other: &dyn Action) -> bool;

    /// Combine this action with its successor into one equivalent step.
    ///
    /// Used by plan compression; `None` (the default) means the pair
    /// cannot be combined.
    fn merge_with_next(&self, next: &dyn Action) -> Option<Box<dyn Action>> {
        let _ = next;
        None
    }

    /// Whether this action and its successor cancel out entirely.
    ///
    /// Used by plan compression; `false` (the default) means they do not.
    fn delete_with_next(&self, next: &dyn Action) -> bool {
        let _ = next;
        false
    }
}
