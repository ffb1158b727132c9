//! Plans and the prefix-sharing action graph.
//!
//! A regridding request becomes an ordered sequence of [`Action`]s, an
//! [`ActionPlan`]. Plans from concurrent requests are absorbed into a
//! shared [`ActionGraph`], which collapses value-equal prefixes so common
//! work is computed once and branches only where requests diverge. Each
//! absorbed plan registers a [`Watcher`] that is notified of failures
//! along its path and may veto propagation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod action;
pub mod context;
pub mod error;
pub mod graph;
pub mod plan;
pub mod registry;
#[cfg(test)]
mod test_support;

pub use action::Action;
pub use context::Context;
pub use error::{ActionError, ExecutionError, PlanError};
pub use graph::{ActionGraph, ActionNode, Watcher};
pub use plan::ActionPlan;
pub use registry::ActionRegistry;
