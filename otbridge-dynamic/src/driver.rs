//! Driver for plugin-backed tracers.

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use serde::Deserialize;

use otbridge::config::PropagationMode;
use otbridge::driver::Driver;
use otbridge::engine::Tracer;
use otbridge::error::Error;
use otbridge::registry::{DriverContext, DriverRegistry};
use otbridge::slot::ThreadLocalSlot;
use otbridge::stats::TracerStats;

use crate::error::PluginError;
use crate::loader::{LoadedPlugin, PluginLoader};
use crate::tracer::DynamicTracer;

fn default_propagation_mode() -> PropagationMode {
    // Plugin tracers define their own header format; propagate both it and
    // the inline header so either side of a hop can pick its format.
    PropagationMode::Dual
}

fn default_drop_logs() -> bool {
    true
}

/// Configuration of a plugin-backed driver.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DynamicConfig {
    /// Filesystem path of the tracer plugin.
    pub library: PathBuf,
    /// Vendor-schema document handed to the factory unmodified.
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default = "default_propagation_mode")]
    pub propagation_mode: PropagationMode,
    #[serde(default = "default_drop_logs")]
    pub drop_logs: bool,
}

/// Driver whose tracer engine lives in a shared library chosen at
/// configuration time.
#[derive(Debug)]
pub struct DynamicDriver {
    propagation_mode: PropagationMode,
    drop_logs: bool,
    tracer_stats: Arc<TracerStats>,
    slot: ThreadLocalSlot<DynamicTracer>,
}

impl DynamicDriver {
    /// Load the plugin and build its tracer. Any load, symbol or factory
    /// failure is fatal to this driver instance; the library handle never
    /// outlives the error.
    pub fn new(config: DynamicConfig) -> Result<Self, PluginError> {
        let tracer_config = config.config.to_string();
        let plugin = Arc::new(PluginLoader::load(&config.library, &tracer_config)?);
        let slot = {
            let plugin: Arc<LoadedPlugin> = plugin.clone();
            ThreadLocalSlot::new(move |_handle| DynamicTracer::new(plugin.clone()))
        };
        Ok(DynamicDriver {
            propagation_mode: config.propagation_mode,
            drop_logs: config.drop_logs,
            tracer_stats: Arc::new(TracerStats::default()),
            slot,
        })
    }
}

impl Driver for DynamicDriver {
    fn tracer(&self) -> Rc<dyn Tracer> {
        self.slot.get()
    }

    fn propagation_mode(&self) -> PropagationMode {
        self.propagation_mode
    }

    fn drop_logs(&self) -> bool {
        self.drop_logs
    }

    fn tracer_stats(&self) -> &Arc<TracerStats> {
        &self.tracer_stats
    }
}

/// Vendor tag of the plugin driver in a [`DriverRegistry`].
pub const DYNAMIC_DRIVER_NAME: &str = "dynamic";

/// Register the plugin driver factory.
pub fn register(registry: &mut DriverRegistry) {
    registry.register(DYNAMIC_DRIVER_NAME, |document, _context: &DriverContext| {
        let config: DynamicConfig = serde_json::from_value(document.clone())
            .map_err(|err| Error::Config(err.into()))?;
        let driver = DynamicDriver::new(config)?;
        Ok(Box::new(driver) as Box<dyn Driver + Send + Sync>)
    });
}
