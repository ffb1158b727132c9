//! Straight-line action plans.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use regrid_core::param::{Overlay, ParamMap, Parametrisation};

use crate::action::Action;
use crate::context::Context;
use crate::error::{ExecutionError, PlanError};
use crate::registry::ActionRegistry;

/// The ordered sequence of actions for one request.
///
/// A plan is a straight-line pipeline: no branching, order significant,
/// append-only while being built. Steps are resolved through an
/// [`ActionRegistry`] against the plan's base parametrisation, optionally
/// fronted by per-step overrides that the built action owns.
pub struct ActionPlan {
    base: Arc<dyn Parametrisation>,
    actions: Vec<Box<dyn Action>>,
}

impl ActionPlan {
    /// An empty plan over `base`.
    pub fn new(base: Arc<dyn Parametrisation>) -> Self {
        Self {
            base,
            actions: Vec::new(),
        }
    }

    /// Resolve `name` through the registry and append the built action.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] for an unknown name or unusable parameters;
    /// the plan is left unchanged.
    pub fn add(&mut self, registry: &ActionRegistry, name: &str) -> Result<(), PlanError> {
        let action = registry.build(name, Arc::clone(&self.base))?;
        self.actions.push(action);
        Ok(())
    }

    /// Like [`add`](ActionPlan::add), with per-step parameter overrides
    /// placed in front of the base parametrisation.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] for an unknown name or unusable parameters.
    pub fn add_with(
        &mut self,
        registry: &ActionRegistry,
        name: &str,
        overrides: ParamMap,
    ) -> Result<(), PlanError> {
        let params: Arc<dyn Parametrisation> =
            Arc::new(Overlay::new(overrides, Arc::clone(&self.base)));
        let action = registry.build(name, params)?;
        self.actions.push(action);
        Ok(())
    }

    /// Append a directly constructed action.
    ///
    /// Terminal save/copy steps carry their sink handle and are built by
    /// the planner rather than the registry.
    pub fn add_action(&mut self, action: Box<dyn Action>) {
        self.actions.push(action);
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Positional read access, for merging and inspection.
    pub fn action(&self, i: usize) -> Option<&dyn Action> {
        self.actions.get(i).map(|a| a.as_ref())
    }

    /// The base parametrisation steps are built against.
    pub fn base(&self) -> &Arc<dyn Parametrisation> {
        &self.base
    }

    /// Run every step in order against `context`.
    ///
    /// # Errors
    ///
    /// Returns the first step's failure as an [`ExecutionError`];
    /// remaining steps do not run.
    pub fn execute(&self, context: &mut Context) -> Result<(), ExecutionError> {
        for action in &self.actions {
            debug!(action = %action, "executing plan step");
            let start = Instant::now();
            action
                .execute(context)
                .map_err(|error| ExecutionError::new(action.as_ref(), error))?;
            context.record_action(action.name(), start.elapsed());
        }
        Ok(())
    }

    /// Collapse adjacent steps until a fixed point.
    ///
    /// Each pass asks every adjacent pair whether it cancels out
    /// ([`delete_with_next`](Action::delete_with_next)) or combines into
    /// one step ([`merge_with_next`](Action::merge_with_next)).
    pub fn compress(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            let mut i = 0;
            while i + 1 < self.actions.len() {
                if self.actions[i].delete_with_next(self.actions[i + 1].as_ref()) {
                    debug!(
                        first = %self.actions[i],
                        second = %self.actions[i + 1],
                        "compression dropped an action pair"
                    );
                    self.actions.drain(i..=i + 1);
                    changed = true;
                } else if let Some(merged) =
                    self.actions[i].merge_with_next(self.actions[i + 1].as_ref())
                {
                    debug!(
                        first = %self.actions[i],
                        second = %self.actions[i + 1],
                        merged = %merged,
                        "compression merged an action pair"
                    );
                    self.actions[i] = merged;
                    self.actions.remove(i + 1);
                    changed = true;
                } else {
                    i += 1;
                }
            }
        }
    }

    /// Consume the plan, yielding its steps in order.
    pub fn into_actions(self) -> Vec<Box<dyn Action>> {
        self.actions
    }
}

impl fmt::Display for ActionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, action) in self.actions.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{action}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;
    use crate::test_support::NoopAction;
    use std::any::Any;

    /// Test action that merges with an equal-tagged sibling and cancels
    /// against its mirror tag.
    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Shift {
        by: i64,
    }

    impl fmt::Display for Shift {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Shift[by={}]", self.by)
        }
    }

    impl Action for Shift {
        fn name(&self) -> &str {
            "shift"
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

        fn merge_with_next(&self, next: &dyn Action) -> Option<Box<dyn Action>> {
            let next = next.as_any().downcast_ref::<Self>()?;
            if self.by + next.by == 0 {
                return None;
            }
            Some(Box::new(Shift {
                by: self.by + next.by,
            }))
        }

        fn delete_with_next(&self, next: &dyn Action) -> bool {
            next.as_any()
                .downcast_ref::<Self>()
                .is_some_and(|next| self.by + next.by == 0)
        }
    }

    fn base() -> Arc<dyn Parametrisation> {
        Arc::new(ParamMap::new())
    }

    #[test]
    fn compress_merges_adjacent_pairs() {
        let mut plan = ActionPlan::new(base());
        plan.add_action(Box::new(Shift { by: 2 }));
        plan.add_action(Box::new(Shift { by: 3 }));
        plan.add_action(Box::new(NoopAction::new("end")));
        plan.compress();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.action(0).unwrap().to_string(), "Shift[by=5]");
    }

    #[test]
    fn compress_drops_cancelling_pairs() {
        let mut plan = ActionPlan::new(base());
        plan.add_action(Box::new(NoopAction::new("start")));
        plan.add_action(Box::new(Shift { by: 4 }));
        plan.add_action(Box::new(Shift { by: -4 }));
        plan.add_action(Box::new(NoopAction::new("end")));
        plan.compress();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.to_string(), "Noop[tag=start] | Noop[tag=end]");
    }

    #[test]
    fn compress_reaches_a_fixed_point_across_passes() {
        // 2, 3, -5: merging 2+3 exposes a cancelling 5/-5 pair.
        let mut plan = ActionPlan::new(base());
        plan.add_action(Box::new(Shift { by: 2 }));
        plan.add_action(Box::new(Shift { by: 3 }));
        plan.add_action(Box::new(Shift { by: -5 }));
        plan.compress();

        assert!(plan.is_empty());
    }

    #[test]
    fn add_with_fronts_the_base_parametrisation() {
        let mut registry = ActionRegistry::new();
        registry.register("noop", |params| {
            let tag = params
                .get_string("tag")
                .ok_or_else(|| PlanError::MissingParameter {
                    action: "noop".to_string(),
                    key: "tag".to_string(),
                })?;
            Ok(Box::new(NoopAction::new(&tag)))
        });

        let mut base = ParamMap::new();
        base.set("tag", "base");
        let mut plan = ActionPlan::new(Arc::new(base));
        plan.add(&registry, "noop").unwrap();
        let mut overrides = ParamMap::new();
        overrides.set("tag", "override");
        plan.add_with(&registry, "noop", overrides).unwrap();

        assert_eq!(plan.to_string(), "Noop[tag=base] | Noop[tag=override]");
    }

    #[test]
    fn unknown_action_leaves_the_plan_unchanged() {
        let registry = ActionRegistry::new();
        let mut plan = ActionPlan::new(base());
        assert!(matches!(
            plan.add(&registry, "frobnicate"),
            Err(PlanError::UnknownAction { .. })
        ));
        assert!(plan.is_empty());
    }
}
