//! Error types for field data and field I/O.

use std::error::Error;
use std::fmt;
use std::io;

/// Errors from constructing or mutating a [`Field`](crate::field::Field).
#[derive(Clone, Debug, PartialEq)]
pub enum FieldError {
    /// The value vector does not match the representation's point count.
    SizeMismatch {
        /// Point count declared by the representation.
        expected: usize,
        /// Length of the supplied value vector.
        actual: usize,
    },
    /// A bounding box failed validation.
    InvalidBoundingBox {
        /// Human-readable description of the problem.
        detail: String,
    },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch { expected, actual } => {
                write!(f, "field has {actual} values, representation has {expected} points")
            }
            Self::InvalidBoundingBox { detail } => {
                write!(f, "invalid bounding box: {detail}")
            }
        }
    }
}

impl Error for FieldError {}

/// Errors from reading a field out of a [`FieldSource`](crate::traits::FieldSource).
#[derive(Debug)]
pub enum SourceError {
    /// An I/O error occurred while reading.
    Io(io::Error),
    /// The container could be read but not decoded into a field.
    Decode {
        /// Human-readable description of the problem.
        detail: String,
    },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error reading field: {e}"),
            Self::Decode { detail } => write!(f, "cannot decode field: {detail}"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Decode { .. } => None,
        }
    }
}

impl From<io::Error> for SourceError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Errors from writing a field into a [`FieldSink`](crate::traits::FieldSink).
#[derive(Debug)]
pub enum SinkError {
    /// An I/O error occurred while writing.
    Io(io::Error),
    /// The field could not be encoded into the output container.
    Encode {
        /// Human-readable description of the problem.
        detail: String,
    },
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error writing field: {e}"),
            Self::Encode { detail } => write!(f, "cannot encode field: {detail}"),
        }
    }
}

impl Error for SinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode { .. } => None,
        }
    }
}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
