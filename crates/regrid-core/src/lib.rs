//! Core types and collaborator traits for the Regrid toolkit.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! layered parametrisation model, the field/representation data model, the
//! narrow traits through which the planning and caching layers talk to
//! their collaborators (field sources and sinks), and the statistics
//! accumulated during plan execution.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod param;
pub mod repres;
pub mod stats;
pub mod traits;

pub use error::{FieldError, SinkError, SourceError};
pub use field::Field;
pub use param::{Merged, Overlay, ParamMap, Parametrisation, Value};
pub use repres::{BoundingBox, RegularGaussian, RegularLatLon, Representation, SphericalHarmonics};
pub use stats::Statistics;
pub use traits::{FieldSink, FieldSource};
