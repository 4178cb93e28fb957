//! In-memory session catalog of targets.

use crate::error::{PlannerError, PlannerResult};
use crate::models::Target;

/// Ordered collection of targets keyed by name.
///
/// Lives only as long as the session that owns it.
#[derive(Debug, Clone, Default)]
pub struct TargetCatalog {
    targets: Vec<Target>,
}

impl TargetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a target, returning the one it replaced (same position).
    pub fn insert(&mut self, target: Target) -> Option<Target> {
        match self.targets.iter().position(|t| t.name() == target.name()) {
            Some(idx) => Some(std::mem::replace(&mut self.targets[idx], target)),
            None => {
                self.targets.push(target);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> PlannerResult<&Target> {
        self.targets
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| PlannerError::TargetNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> PlannerResult<&mut Target> {
        self.targets
            .iter_mut()
            .find(|t| t.name() == name)
            .ok_or_else(|| PlannerError::TargetNotFound(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> PlannerResult<Target> {
        let idx = self
            .targets
            .iter()
            .position(|t| t.name() == name)
            .ok_or_else(|| PlannerError::TargetNotFound(name.to_string()))?;
        Ok(self.targets.remove(idx))
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl FromIterator<Target> for TargetCatalog {
    fn from_iter<I: IntoIterator<Item = Target>>(iter: I) -> Self {
        let mut catalog = TargetCatalog::new();
        for target in iter {
            catalog.insert(target);
        }
        catalog
    }
}
