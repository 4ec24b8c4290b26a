//! Dynamically loaded tracer plugins for the `otbridge` framework.
//!
//! A vendor can ship its tracer as a shared library unknown at build time:
//! the library is opened by path, a conventional factory symbol derived
//! from its base filename (`make_<basename>_tracer`) is resolved and
//! invoked with an opaque configuration document, and the resulting
//! function table is adapted into the core [`otbridge::engine::Tracer`]
//! capability.
//!
//! Failures are fatal to the driver being constructed, never degraded: an
//! unopenable library, a missing factory symbol (reported with the derived
//! name, to aid debugging) and a failing factory each surface as a distinct
//! [`error::PluginError`], and the OS handle is closed on every failure
//! path. On success the handle is retained for the driver's lifetime.

pub mod abi;
pub mod driver;
pub mod error;
pub mod loader;
pub mod tracer;

pub use abi::{RawCarrierReader, RawCarrierWriter, RawTracerApi, TracerFactoryFn};
pub use driver::{register, DynamicConfig, DynamicDriver, DYNAMIC_DRIVER_NAME};
pub use error::PluginError;
pub use loader::{factory_symbol, LoadedPlugin, PluginLoader};
pub use tracer::{DynamicSpanContext, DynamicTracer};
