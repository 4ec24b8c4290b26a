//! Transport failure classification.

use std::time::Duration;

use thiserror::Error;

/// A collector call that did not produce a usable response.
///
/// All of these are non-fatal: tracing is best-effort, failed reports are
/// counted and the affected spans are lost. There is no retry.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// The request never produced a response.
    #[error("collector call failed: {0}")]
    Connect(String),

    /// The configured timeout elapsed before a response arrived.
    #[error("collector call timed out after {0:?}")]
    Timeout(Duration),

    /// The collector answered outside the gRPC protocol.
    #[error("collector returned HTTP status {0}")]
    HttpStatus(u16),

    /// The collector answered with a non-OK gRPC status.
    #[error("collector returned grpc-status {0}")]
    GrpcStatus(u32),

    /// The response arrived but could not be parsed into the expected
    /// message type.
    #[error("failed to parse collector response: {0}")]
    MalformedResponse(String),

    /// The outbound request could not be built.
    #[error("invalid collector request: {0}")]
    InvalidRequest(String),
}

impl From<http::Error> for TransportError {
    fn from(err: http::Error) -> Self {
        TransportError::InvalidRequest(err.to_string())
    }
}

impl From<TransportError> for otbridge::Error {
    fn from(err: TransportError) -> Self {
        otbridge::Error::Other(Box::new(err))
    }
}
