//! Collaborator seams for field I/O.
//!
//! The surrounding application decodes and encodes whatever container
//! format it uses (GRIB, NetCDF, plain arrays in tests); the planning and
//! execution layers only ever see these two traits.

use crate::error::{SinkError, SourceError};
use crate::field::Field;
use crate::param::ParamMap;

/// Where a job's input field comes from.
///
/// Metadata must be available without decoding the whole field: request
/// planning happens before the (possibly expensive) read, which execution
/// performs exactly once per job.
pub trait FieldSource: Send + Sync {
    /// The field's metadata (grid type, truncation, packing, ...).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the container's header cannot be read.
    fn metadata(&self) -> Result<ParamMap, SourceError>;

    /// Decode the field.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the container cannot be read or
    /// decoded.
    fn read(&self) -> Result<Field, SourceError>;
}

/// Where a job's output field goes.
///
/// Implementations take `&self` so one sink can be shared across worker
/// threads; interior synchronization is the implementation's business.
/// A sink must only make the output observable once `write` returns
/// successfully; it never exposes a half-written result.
pub trait FieldSink: Send + Sync {
    /// Encode and write the field.
    ///
    /// `accuracy` is the requested packing accuracy in bits per value;
    /// `None` keeps the input's packing.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when encoding or writing fails.
    fn write(&self, field: &Field, accuracy: Option<i64>) -> Result<(), SinkError>;
}
