//! Initialization result artifact.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Whether this party runs one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentOutcome {
    pub need_run: bool,
}

/// Per-component outcome of an initialization pass, in declaration order.
///
/// Serializes as `{"<component>": {"need_run": bool}, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitializationResult {
    entries: Vec<(String, ComponentOutcome)>,
}

impl InitializationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of `component`.
    ///
    /// Component names are unique; the initializer rejects duplicated
    /// declarations before the first component is resolved.
    pub fn record(&mut self, component: impl Into<String>, need_run: bool) {
        let component = component.into();
        debug_assert!(!self.contains(&component), "duplicate component {}", component);
        self.entries.push((component, ComponentOutcome { need_run }));
    }

    pub fn contains(&self, component: &str) -> bool {
        self.get(component).is_some()
    }

    pub fn get(&self, component: &str) -> Option<ComponentOutcome> {
        self.entries
            .iter()
            .find(|(name, _)| name == component)
            .map(|(_, outcome)| *outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ComponentOutcome)> {
        self.entries.iter().map(|(name, outcome)| (name.as_str(), *outcome))
    }

    /// Components this party has to run.
    pub fn components_to_run(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, outcome)| outcome.need_run)
            .map(|(name, _)| name)
            .collect()
    }
}

impl Serialize for InitializationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, outcome) in &self.entries {
            map.serialize_entry(name, outcome)?;
        }
        map.end()
    }
}
