//! Shared-library loading and factory resolution.
//!
//! A plugin is opened by filesystem path, its factory symbol is derived
//! from the library's base filename as `make_<basename>_tracer`, and the
//! factory is invoked once with the vendor configuration document. Every
//! failure path closes the library handle before the error propagates; on
//! success the handle lives exactly as long as the [`LoadedPlugin`].

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::path::Path;
use std::ptr;

use libloading::Library;

use crate::abi::{RawTracerApi, TracerFactoryFn};
use crate::error::PluginError;

/// Derive the factory symbol for a plugin path: path and extension are
/// stripped, so `/usr/lib/widget.so` resolves `make_widget_tracer`.
pub fn factory_symbol(path: &Path) -> Result<String, PluginError> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| PluginError::InvalidPath(path.display().to_string()))?;
    Ok(format!("make_{stem}_tracer"))
}

/// An open plugin library together with the tracer instance it produced.
///
/// The OS handle is owned exclusively and closed on drop, after the plugin
/// tracer has been destroyed through its own table.
pub struct LoadedPlugin {
    api: RawTracerApi,
    raw_api: *mut RawTracerApi,
    _library: Option<Library>,
}

// The plugin contract runs tracers in "no internal threading" mode and the
// framework confines all calls through the table to one worker thread at a
// time (per-thread slots); the table itself is immutable after load. Any
// state the plugin shares between threads is, by contract, its own problem.
unsafe impl Send for LoadedPlugin {}
unsafe impl Sync for LoadedPlugin {}

impl LoadedPlugin {
    pub(crate) fn api(&self) -> &RawTracerApi {
        &self.api
    }

    /// Wrap a table produced outside a shared library (tests).
    #[cfg(test)]
    pub(crate) fn from_api(raw_api: *mut RawTracerApi) -> Self {
        LoadedPlugin {
            api: unsafe { *raw_api },
            raw_api,
            _library: None,
        }
    }
}

impl Drop for LoadedPlugin {
    fn drop(&mut self) {
        unsafe { (self.api.destroy)(self.raw_api) };
        // The library handle, if any, closes after the plugin is destroyed.
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin").finish_non_exhaustive()
    }
}

/// Loads tracer plugins by path.
#[derive(Debug)]
pub struct PluginLoader;

impl PluginLoader {
    /// Open `path` and build its tracer with `tracer_config`, an opaque
    /// vendor-schema JSON document passed through unmodified.
    pub fn load(path: &Path, tracer_config: &str) -> Result<LoadedPlugin, PluginError> {
        let symbol = factory_symbol(path)?;
        let library = unsafe { Library::new(path) }.map_err(|err| PluginError::Open {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Self::build(library, path, &symbol, tracer_config)
    }

    fn build(
        library: Library,
        path: &Path,
        symbol: &str,
        tracer_config: &str,
    ) -> Result<LoadedPlugin, PluginError> {
        let symbol_name =
            CString::new(symbol.as_bytes()).map_err(|_| PluginError::InvalidConfig)?;
        // Dropping `library` on any early return below closes the handle.
        let factory: TracerFactoryFn = match unsafe {
            library.get::<TracerFactoryFn>(symbol_name.as_bytes_with_nul())
        } {
            Ok(factory) => *factory,
            Err(_) => {
                return Err(PluginError::MissingSymbol {
                    path: path.display().to_string(),
                    symbol: symbol.to_string(),
                })
            }
        };

        let config = CString::new(tracer_config).map_err(|_| PluginError::InvalidConfig)?;
        let mut api_out: *mut RawTracerApi = ptr::null_mut();
        let mut error_out: *mut c_char = ptr::null_mut();
        let code = unsafe { factory(config.as_ptr(), &mut api_out, &mut error_out) };
        let message = take_error_message(&mut error_out);

        if code != 0 || api_out.is_null() {
            return Err(PluginError::Factory {
                symbol: symbol.to_string(),
                code,
                message,
            });
        }

        Ok(LoadedPlugin {
            api: unsafe { *api_out },
            raw_api: api_out,
            _library: Some(library),
        })
    }
}

/// Copy and free a factory-allocated error string. Plugins allocate these
/// with `malloc`; an empty message is returned when the slot stays null.
fn take_error_message(error_out: &mut *mut c_char) -> String {
    if error_out.is_null() {
        return String::new();
    }
    let message = unsafe { CStr::from_ptr(*error_out) }
        .to_string_lossy()
        .into_owned();
    unsafe { libc::free(*error_out as *mut c_void) };
    *error_out = ptr::null_mut();
    message
}
