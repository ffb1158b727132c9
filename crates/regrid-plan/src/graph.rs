//! The prefix-sharing action graph.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::action::Action;
use crate::context::Context;
use crate::error::{ActionError, ExecutionError};
use crate::plan::ActionPlan;

/// Observer of execution failures along one absorbed plan's path.
///
/// [`failure`](Watcher::failure) is called once per failing action, on
/// every watcher registered for a node on the failing path. Returning
/// `true` votes to propagate the failure to the ultimate caller;
/// returning `false` suppresses it for this watcher. The failure
/// propagates iff the failing node has no watchers or any watcher voted
/// to propagate.
pub trait Watcher: Send + Sync {
    /// Observe a failure. Return `true` to propagate it.
    fn failure(&self, error: &ActionError, action: &dyn Action) -> bool;
}

/// One node of the graph: an action, the watchers of every plan whose
/// path traverses it, and the subgraph below it.
pub struct ActionNode {
    action: Box<dyn Action>,
    watchers: Vec<Arc<dyn Watcher>>,
    children: Box<ActionGraph>,
}

impl ActionNode {
    /// The node's action.
    pub fn action(&self) -> &dyn Action {
        self.action.as_ref()
    }

    /// The subgraph below this node.
    pub fn children(&self) -> &ActionGraph {
        &self.children
    }

    /// Execute this node's action against `context`.
    ///
    /// Returns `Ok(true)` when the traversal should descend into the
    /// children, and `Ok(false)` when the action failed but every watcher
    /// suppressed the failure: that branch stops, siblings continue.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] when the action failed and the failure
    /// propagates (no watchers, or any watcher voted to propagate).
    pub fn run(&self, context: &mut Context) -> Result<bool, ExecutionError> {
        debug!(action = %self.action, "executing graph node");
        let start = Instant::now();
        match self.action.execute(context) {
            Ok(()) => {
                context.record_action(self.action.name(), start.elapsed());
                Ok(true)
            }
            Err(error) => {
                let mut propagate = self.watchers.is_empty();
                for watcher in &self.watchers {
                    if watcher.failure(&error, self.action.as_ref()) {
                        propagate = true;
                    }
                }
                if propagate {
                    Err(ExecutionError::new(self.action.as_ref(), error))
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn execute_serial(&self, context: &mut Context) -> Result<(), ExecutionError> {
        if self.run(context)? {
            self.children.execute_into(context)?;
        }
        Ok(())
    }

    fn count(&self) -> usize {
        1 + self.children.node_count()
    }

    fn dump(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.action, indent = depth * 2)?;
        for child in &self.children.nodes {
            child.dump(f, depth + 1)?;
        }
        Ok(())
    }
}

/// The prefix-sharing merge of many [`ActionPlan`]s.
///
/// A forest of [`ActionNode`]s encoding the union of every absorbed
/// plan: plans sharing a leading sequence of value-equal actions share
/// that chain of nodes and branch at the first step where they diverge.
/// Within one sibling set no two nodes hold equivalent actions.
///
/// The graph only ever grows (absorption appends, execution never
/// mutates topology), and the absorbed set determines the result
/// independently of absorption order.
#[derive(Default)]
pub struct ActionGraph {
    nodes: SmallVec<[ActionNode; 2]>,
}

impl ActionGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb a plan, registering `watcher` on every node of its path.
    ///
    /// Walks from the root matching the plan's steps against existing
    /// siblings by [`Action::same_as`]; the first unmatched step starts a
    /// fresh chain for the remaining suffix. Matched nodes keep their
    /// original action (the equivalence-class representative) and gain
    /// the new plan's watcher.
    pub fn add(&mut self, plan: ActionPlan, watcher: Option<Arc<dyn Watcher>>) {
        let mut current = self;
        for action in plan.into_actions() {
            let matched = current
                .nodes
                .iter()
                .position(|node| node.action.same_as(action.as_ref()));
            let index = match matched {
                Some(index) => {
                    if let Some(watcher) = &watcher {
                        current.nodes[index].watchers.push(Arc::clone(watcher));
                    }
                    index
                }
                None => {
                    current.nodes.push(ActionNode {
                        action,
                        watchers: watcher.iter().map(Arc::clone).collect(),
                        children: Box::new(ActionGraph::new()),
                    });
                    current.nodes.len() - 1
                }
            };
            current = &mut current.nodes[index].children;
        }
    }

    /// The root sibling set.
    pub fn nodes(&self) -> &[ActionNode] {
        &self.nodes
    }

    /// Whether the graph holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(ActionNode::count).sum()
    }

    /// Execute the graph serially on the calling thread.
    ///
    /// Every sibling beyond the last runs against a
    /// [`branch`](Context::branch) of the context, so sibling subtrees
    /// never observe each other's field mutations. A node's action runs
    /// strictly after its ancestors' and strictly before its children's.
    ///
    /// # Errors
    ///
    /// Returns the first propagating [`ExecutionError`]; suppressed
    /// failures stop their branch only.
    pub fn execute(&self, context: Context) -> Result<(), ExecutionError> {
        let mut context = context;
        self.execute_into(&mut context)
    }

    fn execute_into(&self, context: &mut Context) -> Result<(), ExecutionError> {
        for (i, node) in self.nodes.iter().enumerate() {
            if i + 1 == self.nodes.len() {
                node.execute_serial(context)?;
            } else {
                let mut branched = context.branch();
                node.execute_serial(&mut branched)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ActionGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            node.dump(f, 0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regrid_core::param::ParamMap;
    use crate::test_support::NoopAction;

    fn plan_of(tags: &[&str]) -> ActionPlan {
        let mut plan = ActionPlan::new(Arc::new(ParamMap::new()));
        for tag in tags {
            plan.add_action(Box::new(NoopAction::new(tag)));
        }
        plan
    }

    #[test]
    fn absorbing_the_same_plan_twice_adds_nothing() {
        let mut graph = ActionGraph::new();
        graph.add(plan_of(&["a", "b", "c"]), None);
        assert_eq!(graph.node_count(), 3);
        graph.add(plan_of(&["a", "b", "c"]), None);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn plans_branch_at_the_first_divergence() {
        let mut graph = ActionGraph::new();
        graph.add(plan_of(&["a", "b", "c"]), None);
        graph.add(plan_of(&["a", "b", "d"]), None);

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.nodes().len(), 1);
        let a = &graph.nodes()[0];
        assert_eq!(a.children().nodes().len(), 1);
        let b = &a.children().nodes()[0];
        assert_eq!(b.children().nodes().len(), 2);
    }

    #[test]
    fn absorption_order_does_not_change_the_result() {
        let mut ab = ActionGraph::new();
        ab.add(plan_of(&["a", "b", "c"]), None);
        ab.add(plan_of(&["a", "x", "y"]), None);

        let mut ba = ActionGraph::new();
        ba.add(plan_of(&["a", "x", "y"]), None);
        ba.add(plan_of(&["a", "b", "c"]), None);

        assert_eq!(ab.node_count(), ba.node_count());
        assert_eq!(ab.nodes().len(), 1);
        assert_eq!(ba.nodes().len(), 1);
        assert_eq!(ab.nodes()[0].children().nodes().len(), 2);
        assert_eq!(ba.nodes()[0].children().nodes().len(), 2);
    }

    #[test]
    fn dump_indents_by_depth() {
        let mut graph = ActionGraph::new();
        graph.add(plan_of(&["a", "b"]), None);
        graph.add(plan_of(&["a", "c"]), None);

        assert_eq!(
            graph.to_string(),
            "Noop[tag=a]\n  Noop[tag=b]\n  Noop[tag=c]\n"
        );
    }
}
