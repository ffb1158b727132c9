//! The action registry.

use indexmap::IndexMap;
use std::sync::Arc;

use regrid_core::param::Parametrisation;

use crate::action::Action;
use crate::error::PlanError;

type Factory =
    Box<dyn Fn(Arc<dyn Parametrisation>) -> Result<Box<dyn Action>, PlanError> + Send + Sync>;

/// Maps action kind names to factories.
///
/// Constructed once at application start and passed by reference to
/// whatever builds plans; there is no process-global registry. A factory
/// receives the parametrisation of the step it is building and snapshots
/// whatever parameters affect the action's behavior.
#[derive(Default)]
pub struct ActionRegistry {
    factories: IndexMap<String, Factory>,
}

impl ActionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register(
        &mut self,
        name: &str,
        factory: impl Fn(Arc<dyn Parametrisation>) -> Result<Box<dyn Action>, PlanError>
            + Send
            + Sync
            + 'static,
    ) -> &mut Self {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    /// Build the named action against `params`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::UnknownAction`] for an unregistered name, or
    /// whatever the factory reports about its parameters.
    pub fn build(
        &self,
        name: &str,
        params: Arc<dyn Parametrisation>,
    ) -> Result<Box<dyn Action>, PlanError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PlanError::UnknownAction {
                name: name.to_string(),
            })?;
        factory(params)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(|k| k.as_str())
    }
}
