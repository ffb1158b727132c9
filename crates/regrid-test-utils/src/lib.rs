//! Test utilities and mock types for Regrid development.
//!
//! Provides mock implementations of the collaborator traits
//! ([`FieldSource`], [`FieldSink`], [`InterpolationKernel`],
//! [`MaskProvider`]), simple actions and watchers for graph tests, and
//! field fixtures.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use regrid_cache::{InterpolationKernel, KernelError, Mask, MaskProvider, Triplet, WeightMatrix};
use regrid_core::error::{SinkError, SourceError};
use regrid_core::field::Field;
use regrid_core::param::ParamMap;
use regrid_core::repres::Representation;
use regrid_core::traits::{FieldSink, FieldSource};
use regrid_plan::{Action, ActionError, Context, Watcher};

pub mod fixtures;

// ── MockSource ──────────────────────────────────────────────────

/// A [`FieldSource`] handing out clones of a fixed field.
///
/// Counts reads so tests can assert the exactly-one-read-per-job rule.
pub struct MockSource {
    field: Field,
    metadata: ParamMap,
    reads: AtomicUsize,
}

impl MockSource {
    pub fn new(field: Field) -> Self {
        let mut metadata = field.metadata().clone();
        if let Some(truncation) = field.representation().truncation() {
            metadata.set("truncation", truncation as i64);
        }
        Self {
            field,
            metadata,
            reads: AtomicUsize::new(0),
        }
    }

    /// Number of times [`FieldSource::read`] was called.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl FieldSource for MockSource {
    fn metadata(&self) -> Result<ParamMap, SourceError> {
        Ok(self.metadata.clone())
    }

    fn read(&self) -> Result<Field, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.field.clone())
    }
}

/// A [`FieldSource`] whose read always fails.
pub struct FailingSource;

impl FieldSource for FailingSource {
    fn metadata(&self) -> Result<ParamMap, SourceError> {
        Ok(ParamMap::new())
    }

    fn read(&self) -> Result<Field, SourceError> {
        Err(SourceError::Decode {
            detail: "mock source always fails".to_string(),
        })
    }
}

// ── MockSink ────────────────────────────────────────────────────

/// One write observed by a [`MockSink`].
#[derive(Clone, Debug)]
pub struct WriteRecord {
    pub representation_id: String,
    pub values: Vec<f64>,
    pub accuracy: Option<i64>,
}

/// A [`FieldSink`] recording every write.
#[derive(Default)]
pub struct MockSink {
    writes: Mutex<Vec<WriteRecord>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.lock().len()
    }

    pub fn records(&self) -> Vec<WriteRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<WriteRecord>> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FieldSink for MockSink {
    fn write(&self, field: &Field, accuracy: Option<i64>) -> Result<(), SinkError> {
        self.lock().push(WriteRecord {
            representation_id: field.representation().unique_id(),
            values: field.values().to_vec(),
            accuracy,
        });
        Ok(())
    }
}

// ── CountingKernel ──────────────────────────────────────────────

/// An [`InterpolationKernel`] that counts invocations.
///
/// Produces a deterministic matrix where output point `r` takes the
/// value of input point `r % cols` with weight 1. An optional delay
/// widens race windows in concurrency tests.
pub struct CountingKernel {
    name: String,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingKernel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    /// Number of times [`InterpolationKernel::compute_weights`] ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InterpolationKernel for CountingKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_weights(
        &self,
        input: &dyn Representation,
        output: &dyn Representation,
        _input_mask: Option<&Mask>,
        _output_mask: Option<&Mask>,
    ) -> Result<WeightMatrix, KernelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let rows = output.point_count();
        let cols = input.point_count();
        let triplets = (0..rows)
            .map(|r| Triplet {
                row: r as u64,
                col: (r % cols) as u64,
                weight: 1.0,
            })
            .collect();
        WeightMatrix::from_triplets(rows, cols, triplets).map_err(|e| KernelError::Failed {
            kernel: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

/// An [`InterpolationKernel`] that always fails.
pub struct FailingKernel {
    name: String,
}

impl FailingKernel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl InterpolationKernel for FailingKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_weights(
        &self,
        _input: &dyn Representation,
        _output: &dyn Representation,
        _input_mask: Option<&Mask>,
        _output_mask: Option<&Mask>,
    ) -> Result<WeightMatrix, KernelError> {
        Err(KernelError::Failed {
            kernel: self.name.clone(),
            reason: "mock kernel always fails".to_string(),
        })
    }
}

// ── ConstantMaskProvider ────────────────────────────────────────

/// A [`MaskProvider`] marking every point with the same flag.
pub struct ConstantMaskProvider {
    id: String,
    value: bool,
}

impl ConstantMaskProvider {
    pub fn new(id: &str, value: bool) -> Self {
        Self {
            id: id.to_string(),
            value,
        }
    }
}

impl MaskProvider for ConstantMaskProvider {
    fn unique_id(&self) -> String {
        self.id.clone()
    }

    fn mask(&self, representation: &dyn Representation) -> Result<Vec<bool>, KernelError> {
        Ok(vec![self.value; representation.point_count()])
    }
}

// ── Actions ─────────────────────────────────────────────────────

/// An [`Action`] that does nothing; equivalence is by tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoopAction {
    tag: String,
}

impl NoopAction {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
        }
    }
}

impl fmt::Display for NoopAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Noop[tag={}]", self.tag)
    }
}

impl Action for NoopAction {
    fn name(&self) -> &str {
        "noop"
    }

    fn execute(&self, _context: &mut Context) -> Result<(), ActionError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn Action) -> bool {
        other.as_any().downcast_ref::<Self>() == Some(self)
    }
}

/// An [`Action`] that always fails; equivalence is by tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailingAction {
    tag: String,
}

impl FailingAction {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
        }
    }
}

impl fmt::Display for FailingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fail[tag={}]", self.tag)
    }
}

impl Action for FailingAction {
    fn name(&self) -> &str {
        "fail"
    }

    fn execute(&self, _context: &mut Context) -> Result<(), ActionError> {
        Err(ActionError::Failed {
            action: "fail".to_string(),
            detail: format!("mock action '{}' always fails", self.tag),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn Action) -> bool {
        other.as_any().downcast_ref::<Self>() == Some(self)
    }
}

// ── RecordingWatcher ────────────────────────────────────────────

/// A [`Watcher`] with a fixed verdict that records every invocation.
pub struct RecordingWatcher {
    verdict: bool,
    events: Mutex<Vec<String>>,
}

impl RecordingWatcher {
    /// `verdict` is what [`Watcher::failure`] returns: `true` votes to
    /// propagate, `false` suppresses.
    pub fn new(verdict: bool) -> Self {
        Self {
            verdict,
            events: Mutex::new(Vec::new()),
        }
    }

    /// The recorded `"<action> | <error>"` lines, in invocation order.
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn invocations(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Watcher for RecordingWatcher {
    fn failure(&self, error: &ActionError, action: &dyn Action) -> bool {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{action} | {error}"));
        self.verdict
    }
}
