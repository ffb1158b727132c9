//! Whole-pipeline scenarios: jobs, batches, executors, caches.

use std::sync::Arc;

use regrid_actions::{register_defaults, Numerics};
use regrid_cache::{KernelRegistry, MaskCache, WeightCache};
use regrid_core::param::ParamMap;
use regrid_plan::ActionRegistry;
use regrid_test_utils::{fixtures, CountingKernel, FailingKernel, FailingSource, MockSink, MockSource};

use regrid_exec::{Batch, DefaultPlanner, Executor, Job, JobError, JobOutcome};

struct Harness {
    registry: ActionRegistry,
    kernel: Arc<CountingKernel>,
    defaults: Arc<ParamMap>,
}

impl Harness {
    fn new() -> Self {
        let kernel = Arc::new(CountingKernel::new("bilinear"));
        let mut kernels = KernelRegistry::new();
        kernels.register(Arc::clone(&kernel) as Arc<dyn regrid_cache::InterpolationKernel>);
        kernels.register(Arc::new(FailingKernel::new("broken")));
        let numerics = Arc::new(Numerics::new(
            kernels,
            WeightCache::in_memory(),
            MaskCache::in_memory(),
            None,
        ));
        let mut registry = ActionRegistry::new();
        register_defaults(&mut registry, &numerics);

        let mut defaults = ParamMap::new();
        defaults.set("method", "bilinear");
        Self {
            registry,
            kernel,
            defaults: Arc::new(defaults),
        }
    }

    fn job(
        &self,
        request: ParamMap,
        source: &Arc<MockSource>,
        sink: &Arc<MockSink>,
    ) -> Result<Job, JobError> {
        Job::new(
            request,
            Arc::clone(source) as Arc<dyn regrid_core::traits::FieldSource>,
            Arc::clone(sink) as Arc<dyn regrid_core::traits::FieldSink>,
            &self.registry,
            &DefaultPlanner,
            Arc::clone(&self.defaults),
        )
    }
}

fn request(entries: &[(&str, i64)]) -> ParamMap {
    let mut params = ParamMap::new();
    for (key, value) in entries {
        params.set(key, *value);
    }
    params
}

#[test]
fn single_job_reads_once_and_writes_once() {
    let harness = Harness::new();
    let source = Arc::new(MockSource::new(fixtures::latlon_field(3, 3)));
    let sink = Arc::new(MockSink::new());

    let job = harness.job(ParamMap::new(), &source, &sink).unwrap();
    assert_eq!(job.plan().to_string(), "Copy[]");

    let stats = job.execute().unwrap();
    assert_eq!(source.reads(), 1);
    assert_eq!(sink.write_count(), 1);
    assert_eq!(stats.fields_read, 1);
    assert_eq!(stats.fields_written, 1);
}

#[test]
fn exclusive_grid_options_fail_before_planning() {
    let harness = Harness::new();
    let source = Arc::new(MockSource::new(fixtures::latlon_field(3, 3)));
    let sink = Arc::new(MockSink::new());

    let mut bad = ParamMap::new();
    bad.set("grid", vec![1.0, 1.0]).set("gaussian", 2i64);
    let err = harness.job(bad, &source, &sink).unwrap_err();
    assert!(matches!(err, JobError::Config(_)));
    assert_eq!(source.reads(), 0);
    assert_eq!(sink.write_count(), 0);
}

#[test]
fn unknown_method_fails_at_plan_build_time() {
    let harness = Harness::new();
    let source = Arc::new(MockSource::new(fixtures::latlon_field(3, 3)));
    let sink = Arc::new(MockSink::new());

    let mut bad = ParamMap::new();
    bad.set("gaussian", 2i64).set("method", "cubic");
    let err = harness.job(bad, &source, &sink).unwrap_err();
    assert!(matches!(err, JobError::Plan(_)));
    assert_eq!(sink.write_count(), 0);
}

#[test]
fn differing_accuracies_never_share_a_node() {
    let harness = Harness::new();
    let source = Arc::new(MockSource::new(fixtures::latlon_field(3, 3)));
    let sink_a = Arc::new(MockSink::new());
    let sink_b = Arc::new(MockSink::new());

    let mut batch = Batch::new();
    batch.absorb(
        harness
            .job(request(&[("accuracy", 12)]), &source, &sink_a)
            .unwrap(),
    );
    batch.absorb(
        harness
            .job(request(&[("accuracy", 16)]), &source, &sink_b)
            .unwrap(),
    );

    // Two terminal leaves at depth one, nothing shared.
    assert_eq!(batch.graph().node_count(), 2);
    assert_eq!(batch.graph().nodes().len(), 2);
    assert_eq!(
        batch.graph().to_string(),
        "Save[accuracy=12]\nSave[accuracy=16]\n"
    );

    let report = batch.execute(&Executor::Immediate).unwrap();
    assert_eq!(report.outcomes, vec![JobOutcome::Completed; 2]);
    assert_eq!(sink_a.records()[0].accuracy, Some(12));
    assert_eq!(sink_b.records()[0].accuracy, Some(16));
    assert_eq!(source.reads(), 1);
}

#[test]
fn shared_truncation_executes_once() {
    let harness = Harness::new();
    let source = Arc::new(MockSource::new(fixtures::spectral_field(20)));
    let sink_a = Arc::new(MockSink::new());
    let sink_b = Arc::new(MockSink::new());

    let mut batch = Batch::new();
    batch.absorb(
        harness
            .job(
                request(&[("truncation", 5), ("accuracy", 12)]),
                &source,
                &sink_a,
            )
            .unwrap(),
    );
    batch.absorb(
        harness
            .job(
                request(&[("truncation", 5), ("accuracy", 16)]),
                &source,
                &sink_b,
            )
            .unwrap(),
    );

    // One shared truncation root, two save children.
    assert_eq!(batch.graph().node_count(), 3);
    assert_eq!(batch.graph().nodes().len(), 1);
    assert_eq!(batch.graph().nodes()[0].children().nodes().len(), 2);

    let report = batch.execute(&Executor::Pooled { workers: 2 }).unwrap();
    assert_eq!(report.outcomes, vec![JobOutcome::Completed; 2]);
    // The truncation ran once, each save once.
    assert_eq!(report.statistics.actions_executed, 3);
    for sink in [&sink_a, &sink_b] {
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].representation_id, "T5");
        assert_eq!(records[0].values.len(), 6 * 7);
    }
}

#[test]
fn shared_interpolation_computes_weights_once() {
    let harness = Harness::new();
    let source = Arc::new(MockSource::new(fixtures::latlon_field(3, 3)));
    let sink_a = Arc::new(MockSink::new());
    let sink_b = Arc::new(MockSink::new());

    let mut batch = Batch::new();
    for sink in [&sink_a, &sink_b] {
        batch.absorb(
            harness
                .job(request(&[("gaussian", 2)]), &source, sink)
                .unwrap(),
        );
    }

    // The interpolation node is shared; only the saves differ.
    assert_eq!(batch.graph().node_count(), 3);

    let report = batch.execute(&Executor::Pooled { workers: 4 }).unwrap();
    assert_eq!(report.outcomes, vec![JobOutcome::Completed; 2]);
    assert_eq!(harness.kernel.calls(), 1);
    for sink in [&sink_a, &sink_b] {
        assert_eq!(sink.records()[0].representation_id, "F2");
    }
}

#[test]
fn failing_job_does_not_abort_its_siblings() {
    for executor in [Executor::Immediate, Executor::Pooled { workers: 2 }] {
        let harness = Harness::new();
        let source = Arc::new(MockSource::new(fixtures::latlon_field(3, 3)));
        let sink_a = Arc::new(MockSink::new());
        let sink_b = Arc::new(MockSink::new());

        let mut broken = request(&[("gaussian", 2)]);
        broken.set("method", "broken");

        let mut batch = Batch::new();
        batch.absorb(harness.job(broken, &source, &sink_a).unwrap());
        batch.absorb(harness.job(ParamMap::new(), &source, &sink_b).unwrap());

        let report = batch.execute(&executor).unwrap();
        match &report.outcomes[0] {
            JobOutcome::Failed { detail } => assert!(detail.contains("broken")),
            other => panic!("expected a failure, got {other:?}"),
        }
        assert_eq!(report.outcomes[1], JobOutcome::Completed);

        // The failed path never reached its sink.
        assert_eq!(sink_a.write_count(), 0);
        assert_eq!(sink_b.write_count(), 1);
    }
}

#[test]
fn pooled_fan_out_reaches_every_leaf() {
    let harness = Harness::new();
    let source = Arc::new(MockSource::new(fixtures::latlon_field(3, 3)));

    let sinks: Vec<Arc<MockSink>> = (0..8).map(|_| Arc::new(MockSink::new())).collect();
    let mut batch = Batch::new();
    for (i, sink) in sinks.iter().enumerate() {
        batch.absorb(
            harness
                .job(request(&[("accuracy", i as i64 + 1)]), &source, sink)
                .unwrap(),
        );
    }
    assert_eq!(batch.graph().nodes().len(), 8);

    let report = batch.execute(&Executor::Pooled { workers: 3 }).unwrap();
    assert_eq!(report.outcomes, vec![JobOutcome::Completed; 8]);
    for (i, sink) in sinks.iter().enumerate() {
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].accuracy, Some(i as i64 + 1));
    }
    assert_eq!(report.statistics.fields_written, 8);
}

#[test]
fn source_failures_surface_as_execution_errors() {
    let harness = Harness::new();
    let sink = Arc::new(MockSink::new());
    let job = Job::new(
        ParamMap::new(),
        Arc::new(FailingSource) as Arc<dyn regrid_core::traits::FieldSource>,
        Arc::clone(&sink) as Arc<dyn regrid_core::traits::FieldSink>,
        &harness.registry,
        &DefaultPlanner,
        Arc::clone(&harness.defaults),
    )
    .unwrap();

    let err = job.execute().unwrap_err();
    assert!(matches!(err, JobError::Execution(_)));
    assert_eq!(sink.write_count(), 0);
}

#[test]
fn both_executors_agree_on_results() {
    for executor in [Executor::Immediate, Executor::Pooled { workers: 2 }] {
        let harness = Harness::new();
        let source = Arc::new(MockSource::new(fixtures::spectral_field(20)));
        let sink = Arc::new(MockSink::new());

        let mut batch = Batch::new();
        batch.absorb(
            harness
                .job(
                    request(&[("truncation", 5), ("accuracy", 12)]),
                    &source,
                    &sink,
                )
                .unwrap(),
        );

        let report = batch.execute(&executor).unwrap();
        assert_eq!(report.outcomes, vec![JobOutcome::Completed]);
        let records = sink.records();
        assert_eq!(records[0].representation_id, "T5");
        assert_eq!(records[0].accuracy, Some(12));
    }
}
