//! The in-memory field: values plus their representation.

use std::sync::Arc;

use crate::error::FieldError;
use crate::param::ParamMap;
use crate::repres::Representation;

/// A discretized scalar field.
///
/// Owns its value vector; cloning a field clones the values, so two clones
/// never observe each other's mutations. The representation is shared (it
/// is immutable).
#[derive(Clone, Debug)]
pub struct Field {
    representation: Arc<dyn Representation>,
    values: Vec<f64>,
    metadata: ParamMap,
}

impl Field {
    /// Construct a field, checking the value count against the
    /// representation.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::SizeMismatch`] when `values.len()` differs
    /// from the representation's point count.
    pub fn new(
        representation: Arc<dyn Representation>,
        values: Vec<f64>,
        metadata: ParamMap,
    ) -> Result<Self, FieldError> {
        if values.len() != representation.point_count() {
            return Err(FieldError::SizeMismatch {
                expected: representation.point_count(),
                actual: values.len(),
            });
        }
        Ok(Self {
            representation,
            values,
            metadata,
        })
    }

    /// The field's representation.
    pub fn representation(&self) -> &Arc<dyn Representation> {
        &self.representation
    }

    /// The field's values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable access to the values (in-place transforms).
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Metadata carried over from the input container.
    pub fn metadata(&self) -> &ParamMap {
        &self.metadata
    }

    /// Swap in a new representation and matching values.
    ///
    /// This is how transforming actions publish their result: the old
    /// layout and values are replaced together so the size invariant can
    /// never be observed broken.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::SizeMismatch`] when the new values do not
    /// match the new representation; the field is left unchanged.
    pub fn replace(
        &mut self,
        representation: Arc<dyn Representation>,
        values: Vec<f64>,
    ) -> Result<(), FieldError> {
        if values.len() != representation.point_count() {
            return Err(FieldError::SizeMismatch {
                expected: representation.point_count(),
                actual: values.len(),
            });
        }
        self.representation = representation;
        self.values = values;
        Ok(())
    }
}
