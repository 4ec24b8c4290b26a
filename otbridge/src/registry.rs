//! Driver factory registry.
//!
//! Vendors are selected at configuration time by name: the host registers a
//! factory per vendor tag and resolves the configured one when (re)loading
//! its tracing configuration. An unknown tag is a configuration error.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ClusterSet, RuntimeOverrides};
use crate::driver::Driver;
use crate::error::{ConfigError, Error};

/// Host facilities a driver factory may need at construction time.
#[derive(Clone, Debug)]
pub struct DriverContext {
    /// Known upstream clusters, for collector resolution.
    pub clusters: Arc<ClusterSet>,
    /// Runtime override source for tunable settings.
    pub overrides: Arc<dyn RuntimeOverrides>,
}

type DriverFactory =
    Box<dyn Fn(&serde_json::Value, &DriverContext) -> Result<Box<dyn Driver + Send + Sync>, Error> + Send + Sync>;

/// Tagged registry of driver factories.
#[derive(Default)]
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a vendor tag, replacing any prior entry.
    pub fn register<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn(&serde_json::Value, &DriverContext) -> Result<Box<dyn Driver + Send + Sync>, Error>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name, Box::new(factory));
    }

    /// Build the driver registered under `name` from its configuration
    /// document.
    pub fn create(
        &self,
        name: &str,
        config: &serde_json::Value,
        context: &DriverContext,
    ) -> Result<Box<dyn Driver + Send + Sync>, Error> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDriver(name.to_string()))?;
        factory(config, context)
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
