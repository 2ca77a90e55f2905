//! Backend dispatch registry
//!
//! Holds an ordered list of backend candidates and picks the first whose
//! `matches` claims a model path. Registration order is dispatch priority.

use super::ChatModel;
use crate::error::{Error, Result};

/// Registered backend candidates, probed in registration order
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<(String, Box<dyn ChatModel>)>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under a name
    pub fn register(&mut self, name: impl Into<String>, backend: Box<dyn ChatModel>) {
        self.backends.push((name.into(), backend));
    }

    /// Number of registered backends
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Registered backend names in dispatch order
    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Resolve the first backend claiming the model path
    ///
    /// # Errors
    ///
    /// Returns `NoBackend` when no candidate claims the path.
    pub fn resolve(&self, model_path: &str) -> Result<&dyn ChatModel> {
        self.backends
            .iter()
            .find(|(_, backend)| backend.matches(model_path))
            .map(|(_, backend)| backend.as_ref())
            .ok_or_else(|| Error::NoBackend(model_path.to_string()))
    }
}
