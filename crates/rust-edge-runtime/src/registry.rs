//! Registry of named handler adapters

use std::collections::HashMap;
use std::sync::Arc;

use rust_edge_runtime_sdk::HandlerAdapter;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Handler already registered: {0}")]
    Duplicate(String),
}

/// Maps handler names to adapters. Adapters cannot be replaced once registered.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<HandlerAdapter>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under `name`
    pub fn register(&mut self, name: impl Into<String>, adapter: HandlerAdapter) -> Result<(), RegistryError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        tracing::debug!(handler = %name, style = ?adapter.style(), "Registered handler");
        self.handlers.insert(name, Arc::new(adapter));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<HandlerAdapter>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_edge_runtime_sdk::HandlerStyle;

    fn echo() -> HandlerAdapter {
        HandlerAdapter::untyped_deferred(|event, _| async move { Ok(event) })
    }

    #[test]
    fn test_registry_empty() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.contains("nonexistent"));
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = HandlerRegistry::new();
        registry.register("echo", echo()).unwrap();
        registry
            .register("callback", HandlerAdapter::untyped_callback(|event, _, done| done.succeed(event)))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["callback".to_string(), "echo".to_string()]);
        assert_eq!(registry.get("echo").unwrap().style(), HandlerStyle::UntypedDeferred);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut registry = HandlerRegistry::new();
        registry.register("echo", echo()).unwrap();

        let err = registry.register("echo", echo()).unwrap_err();
        assert_eq!(err, RegistryError::Duplicate("echo".into()));
        assert_eq!(registry.len(), 1);
    }
}
