//! Plugin loading failures.

use thiserror::Error;

/// Failure to produce a tracer from a plugin library.
///
/// All of these are fatal to the driver instance being constructed and are
/// surfaced as configuration/startup errors; none of them crash the host
/// process, and no partially loaded tracer is ever handed out.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PluginError {
    /// The shared library could not be opened.
    #[error("failed to open tracing plugin {path}: {reason}")]
    Open { path: String, reason: String },

    /// The library opened but does not export the derived factory symbol.
    #[error("tracing plugin {path} does not define tracer factory symbol {symbol}")]
    MissingSymbol { path: String, symbol: String },

    /// The factory ran and reported failure.
    #[error("tracer factory {symbol} failed (code {code}): {message}")]
    Factory {
        symbol: String,
        code: i32,
        message: String,
    },

    /// No usable base filename to derive the factory symbol from.
    #[error("invalid tracing plugin path {0}")]
    InvalidPath(String),

    /// The tracer configuration cannot cross the C boundary.
    #[error("tracer configuration contains interior NUL bytes")]
    InvalidConfig,
}

impl From<PluginError> for otbridge::Error {
    fn from(err: PluginError) -> Self {
        otbridge::Error::Other(Box::new(err))
    }
}
