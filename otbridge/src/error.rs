//! Error types shared across the driver framework.

use thiserror::Error;

/// Wrapper for errors raised by the different parts of the framework. This
/// gives us a common error type where we _need_ to return errors that may come
/// from various components, e.g. from driver factories in the registry.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Invalid or unresolvable configuration; fatal at driver construction.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failure while injecting or extracting a span context. These are
    /// per-request and non-fatal; they only surface here when a caller
    /// drives the codec directly.
    #[error(transparent)]
    Propagation(#[from] PropagationError),

    /// Failures raised behind the driver seam by satellite crates
    /// (collector transport, plugin loader).
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Configuration problems that block driver creation. Surfaced as a
/// startup or config-reload failure, never on the request path.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configured collector cluster is not known to the host.
    #[error("{0} collector cluster is not defined on cluster manager level")]
    UnknownCluster(String),

    /// The collector cluster exists but cannot carry gRPC calls.
    #[error("{0} collector cluster must support http2 for gRPC calls")]
    ClusterNotHttp2(String),

    /// The cluster endpoint could not be parsed into a URI.
    #[error("invalid endpoint {endpoint} for collector cluster {cluster}")]
    InvalidEndpoint { cluster: String, endpoint: String },

    /// No driver factory registered under the configured name.
    #[error("no tracing driver registered under {0}")]
    UnknownDriver(String),

    /// The configuration document itself failed to deserialize.
    #[error("invalid tracing configuration: {0}")]
    InvalidDocument(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::InvalidDocument(err.to_string())
    }
}

/// Failure to move a span context across the process boundary in either
/// direction. Non-fatal: callers log, count and continue untraced.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PropagationError {
    /// The inline propagation header did not hold valid base64.
    #[error("span context header is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The tracer engine rejected a serialized span context.
    #[error("tracer failed to deserialize span context: {0}")]
    Extract(String),

    /// The tracer engine could not serialize the active span context.
    #[error("tracer failed to serialize span context: {0}")]
    Inject(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_cluster_message_names_cluster() {
        let err = ConfigError::UnknownCluster("collector".to_string());
        assert_eq!(
            err.to_string(),
            "collector collector cluster is not defined on cluster manager level"
        );
    }

    #[test]
    fn config_error_wraps_into_error() {
        let err: Error = ConfigError::ClusterNotHttp2("lightstep".to_string()).into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("http2"));
    }
}
