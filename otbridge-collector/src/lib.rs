//! Collector transport for the `otbridge` tracing framework.
//!
//! Finished spans buffered by a tracer engine reach the remote collector
//! through the pieces in this crate:
//!
//! * [`transport::CollectorTransport`] — one non-blocking gRPC unary call at
//!   a time, with timeout and health accounting, completing exactly once on
//!   the issuing thread.
//! * [`flush::FlushTimer`] — the recurring per-thread flush cadence, owned
//!   by and dying with the thread's tracer.
//! * [`driver::ReportingDriver`] — the vendor driver shape for
//!   collector-reporting engines: cluster resolution and HTTP/2 validation
//!   at construction, per-thread engine wiring afterwards.
//!
//! The collector protocol is deliberately opaque here: requests and
//! responses are whatever prost messages the engine speaks; this crate only
//! guarantees framing, delivery and failure accounting. Lost reports are
//! acceptable by design and are never retried.

pub mod client;
pub mod driver;
pub mod error;
pub mod flush;
pub mod grpc;
pub mod headers;
pub mod transport;

pub use client::{Http2Client, HttpClient, HttpError};
pub use driver::{EngineContext, EngineFactory, ReportingDriver};
pub use error::TransportError;
pub use flush::{FlushTimer, FLUSH_INTERVAL_KEY};
pub use grpc::GrpcMethod;
pub use headers::{HeaderExtractor, HeaderInjector};
pub use transport::{CollectorTransport, TransportStats, REQUEST_TIMEOUT_KEY};
