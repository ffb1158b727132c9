//! Lower a spectral truncation.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use regrid_core::repres::{Representation, SphericalHarmonics};
use regrid_plan::{Action, ActionError, Context};

/// Truncate a spectral field to a lower wavenumber limit.
///
/// A field already at or below the target truncation passes through
/// unchanged; a non-spectral field fails the action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpectralTruncate {
    target: usize,
}

impl SpectralTruncate {
    /// Truncate to `target`.
    pub fn new(target: usize) -> Self {
        Self { target }
    }

    /// The target truncation.
    pub fn target(&self) -> usize {
        self.target
    }
}

impl fmt::Display for SpectralTruncate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Truncate[truncation={}]", self.target)
    }
}

impl Action for SpectralTruncate {
    fn name(&self) -> &str {
        "truncate"
    }

    fn execute(&self, context: &mut Context) -> Result<(), ActionError> {
        let field = context.field_mut()?;
        let repres = Arc::clone(field.representation());
        let spectral = repres
            .as_any()
            .downcast_ref::<SphericalHarmonics>()
            .ok_or_else(|| ActionError::Failed {
                action: "truncate".to_string(),
                detail: format!("{} is not spectral", repres.unique_id()),
            })?;
        if let Some((truncated, values)) = spectral.truncate_values(field.values(), self.target) {
            field.replace(Arc::new(truncated), values)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn Action) -> bool {
        other.as_any().downcast_ref::<Self>() == Some(self)
    }
}
