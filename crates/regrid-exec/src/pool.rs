//! The bounded worker pool behind the pooled execution strategy.
//!
//! One task per graph node. A task runs its node's action and then
//! submits one task per child, branching the context per sibling, so
//! the graph's fan-out maps directly onto a fan-out of tasks. The
//! queue's [`wait`](TaskQueue::wait) is a drain barrier: it returns
//! once every submitted and in-flight task has completed.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

use regrid_plan::{ActionGraph, ActionNode, Context, ExecutionError};

enum Message<'g> {
    Run(Task<'g>),
    Shutdown,
}

struct Task<'g> {
    node: &'g ActionNode,
    context: Context,
}

struct TaskQueue<'g> {
    tx: Sender<Message<'g>>,
    pending: Mutex<usize>,
    drained: Condvar,
    error: Mutex<Option<ExecutionError>>,
}

impl<'g> TaskQueue<'g> {
    fn new() -> (Self, Receiver<Message<'g>>) {
        let (tx, rx) = unbounded();
        (
            Self {
                tx,
                pending: Mutex::new(0),
                drained: Condvar::new(),
                error: Mutex::new(None),
            },
            rx,
        )
    }

    fn submit(&self, node: &'g ActionNode, context: Context) {
        *self.lock_pending() += 1;
        self.tx
            .send(Message::Run(Task { node, context }))
            .expect("worker pool queue disconnected");
    }

    /// Block until every submitted task (and whatever tasks those
    /// spawned) has completed.
    fn wait(&self) {
        let mut pending = self.lock_pending();
        while *pending > 0 {
            pending = self
                .drained
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn task_done(&self) {
        let mut pending = self.lock_pending();
        *pending -= 1;
        if *pending == 0 {
            drop(pending);
            self.drained.notify_all();
        }
    }

    /// Record a propagating failure; the first one recorded wins.
    fn record_error(&self, error: ExecutionError) {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(error);
        } else {
            debug!(error = %error, "pooled execution already failed, dropping later error");
        }
    }

    fn take_error(&self) -> Option<ExecutionError> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn shutdown(&self, workers: usize) {
        for _ in 0..workers {
            self.tx
                .send(Message::Shutdown)
                .expect("worker pool queue disconnected");
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, usize> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn worker_loop<'g>(rx: &Receiver<Message<'g>>, queue: &TaskQueue<'g>) {
    while let Ok(message) = rx.recv() {
        match message {
            Message::Run(task) => {
                run_task(task, queue);
                queue.task_done();
            }
            Message::Shutdown => break,
        }
    }
}

fn run_task<'g>(task: Task<'g>, queue: &TaskQueue<'g>) {
    let Task { node, mut context } = task;
    match node.run(&mut context) {
        Ok(true) => submit_siblings(queue, node.children(), context),
        Ok(false) => {}
        Err(error) => queue.record_error(error),
    }
}

/// Submit one task per node of a sibling set. Every sibling beyond the
/// last receives a branch of the context; the last takes it over.
fn submit_siblings<'g>(queue: &TaskQueue<'g>, graph: &'g ActionGraph, context: Context) {
    let Some((last, rest)) = graph.nodes().split_last() else {
        return;
    };
    for node in rest {
        queue.submit(node, context.branch());
    }
    queue.submit(last, context);
}

/// Execute `graph` across `workers` pool threads and block until the
/// queue drains. Failure semantics match the serial traversal: watcher
/// veto applies per node, the first propagating error is reported, and
/// already-submitted siblings run to completion rather than being
/// cancelled.
pub(crate) fn execute(
    graph: &ActionGraph,
    context: Context,
    workers: usize,
) -> Result<(), ExecutionError> {
    let workers = workers.max(1);
    let (queue, rx) = TaskQueue::new();
    thread::scope(|scope| {
        for i in 0..workers {
            let rx = rx.clone();
            let queue = &queue;
            thread::Builder::new()
                .name(format!("regrid-worker-{i}"))
                .spawn_scoped(scope, move || worker_loop(&rx, queue))
                .expect("failed to spawn pool worker");
        }
        submit_siblings(&queue, graph, context);
        queue.wait();
        queue.shutdown(workers);
    });
    match queue.take_error() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regrid_core::param::ParamMap;
    use regrid_core::stats::Statistics;
    use regrid_core::traits::FieldSink;
    use regrid_plan::{Action, ActionError, ActionPlan};
    use regrid_test_utils::{fixtures, FailingAction, MockSink, NoopAction};
    use std::any::Any;
    use std::fmt;
    use std::sync::{Arc, Mutex};

    /// Multiplies every field value; distinct factors are distinct
    /// actions, so two plans with different factors branch at the root.
    struct Scale {
        factor: f64,
    }

    impl fmt::Display for Scale {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Scale[factor={}]", self.factor)
        }
    }

    impl Action for Scale {
        fn name(&self) -> &str {
            "scale"
        }

        fn execute(&self, context: &mut Context) -> Result<(), ActionError> {
            for value in context.field_mut()?.values_mut() {
                *value *= self.factor;
            }
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn same_as(&self, other: &dyn Action) -> bool {
            other
                .as_any()
                .downcast_ref::<Self>()
                .is_some_and(|other| self.factor == other.factor)
        }
    }

    fn context() -> (Context, Arc<Mutex<Statistics>>) {
        let stats = Arc::new(Mutex::new(Statistics::new()));
        let context = Context::with_field(fixtures::latlon_field(2, 2), Arc::clone(&stats));
        (context, stats)
    }

    #[test]
    fn unwatched_failure_surfaces_from_the_pool() {
        let mut plan = ActionPlan::new(Arc::new(ParamMap::new()));
        plan.add_action(Box::new(FailingAction::new("boom")));
        let mut graph = ActionGraph::new();
        graph.add(plan, None);

        let (context, _) = context();
        let err = execute(&graph, context, 2).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn sibling_branches_do_not_share_field_state() {
        let sink_a = Arc::new(MockSink::new());
        let sink_b = Arc::new(MockSink::new());
        let mut graph = ActionGraph::new();
        for (factor, sink) in [(2.0, &sink_a), (3.0, &sink_b)] {
            let mut plan = ActionPlan::new(Arc::new(ParamMap::new()));
            plan.add_action(Box::new(Scale { factor }));
            plan.add_action(Box::new(regrid_actions::Save::new(
                Arc::clone(sink) as Arc<dyn FieldSink>,
                None,
            )));
            graph.add(plan, None);
        }

        let (context, _) = context();
        execute(&graph, context, 4).unwrap();

        // Ramp value 1.0 scaled by exactly one factor on each branch.
        assert_eq!(sink_a.records()[0].values[1], 2.0);
        assert_eq!(sink_b.records()[0].values[1], 3.0);
    }

    #[test]
    fn deep_and_wide_graphs_drain_completely() {
        let mut graph = ActionGraph::new();
        for root in 0..6 {
            for leaf in 0..3 {
                let mut plan = ActionPlan::new(Arc::new(ParamMap::new()));
                plan.add_action(Box::new(NoopAction::new(&format!("root-{root}"))));
                plan.add_action(Box::new(NoopAction::new(&format!("leaf-{root}-{leaf}"))));
                graph.add(plan, None);
            }
        }
        assert_eq!(graph.node_count(), 6 * 4);

        let (context, stats) = context();
        execute(&graph, context, 3).unwrap();
        assert_eq!(stats.lock().unwrap().actions_executed, 6 * 4);
    }

    #[test]
    fn an_empty_graph_is_a_no_op() {
        let (context, stats) = context();
        execute(&ActionGraph::new(), context, 2).unwrap();
        assert_eq!(stats.lock().unwrap().actions_executed, 0);
    }
}
