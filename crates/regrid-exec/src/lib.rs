//! Execution strategies and job orchestration.
//!
//! A [`Job`] couples one request to one input source and one output
//! sink, merges the request with the field's metadata and process
//! defaults, and asks a [`Planner`] for the action sequence. Jobs run
//! alone, or a [`Batch`] absorbs many of them into one shared
//! [`ActionGraph`](regrid_plan::ActionGraph) so common plan prefixes
//! execute once. The [`Executor`] decides whether graph branches run on
//! the calling thread or fan out across a bounded worker pool.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod error;
pub mod executor;
pub mod job;
pub mod planner;
mod pool;

pub use batch::{Batch, BatchReport, JobOutcome};
pub use error::{ConfigError, JobError};
pub use executor::Executor;
pub use job::Job;
pub use planner::{DefaultPlanner, Planner};
