//! Request planning.

use std::sync::Arc;

use regrid_core::param::{Merged, Parametrisation};
use regrid_core::traits::FieldSink;
use regrid_plan::{ActionPlan, ActionRegistry, PlanError};

use regrid_actions::{CopyField, Save};

/// Decides which actions a merged request needs.
///
/// The planner inspects the merged parametrisation (request over field
/// metadata over defaults) and appends the action sequence, including
/// the terminal save or copy carrying the job's sink.
pub trait Planner: Send + Sync {
    /// Build the plan for one request.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when a required action cannot be built;
    /// this is a configuration error surfaced before any execution.
    fn plan(
        &self,
        merged: &Merged,
        registry: &ActionRegistry,
        sink: Arc<dyn FieldSink>,
    ) -> Result<ActionPlan, PlanError>;
}

/// The standard planning policy.
///
/// In pipeline order: spectral truncation when the request asks for a
/// truncation below the (spectral) input's; interpolation when a target
/// grid is requested; area crop when an area is requested. A request
/// needing none of these degenerates to a pure copy, unless it asks
/// for a packing accuracy, which still requires a save step.
pub struct DefaultPlanner;

impl Planner for DefaultPlanner {
    fn plan(
        &self,
        merged: &Merged,
        registry: &ActionRegistry,
        sink: Arc<dyn FieldSink>,
    ) -> Result<ActionPlan, PlanError> {
        let mut plan = ActionPlan::new(Arc::new(merged.clone()) as Arc<dyn Parametrisation>);
        let user = merged.user();
        let mut transformed = false;

        if let (Some(target), Some(current)) = (
            user.get_long("truncation"),
            merged.field().get_long("truncation"),
        ) {
            if target < current {
                plan.add(registry, "truncate")?;
                transformed = true;
            }
        }
        if user.has("grid") || user.has("gaussian") {
            plan.add(registry, "interpolate")?;
            transformed = true;
        }
        if user.has("area") {
            plan.add(registry, "crop")?;
            transformed = true;
        }

        let accuracy = user.get_long("accuracy");
        if transformed || accuracy.is_some() {
            plan.add_action(Box::new(Save::new(sink, accuracy)));
        } else {
            plan.add_action(Box::new(CopyField::new(sink)));
        }

        plan.compress();
        Ok(plan)
    }
}
