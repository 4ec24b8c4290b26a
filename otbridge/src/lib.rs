//! A distributed-tracing driver framework.
//!
//! `otbridge` glues a pluggable tracer engine into a multi-worker host: each
//! worker thread owns its tracer, inbound requests get their causal parent
//! extracted from headers in a dual-format propagation protocol, spans wrap
//! the engine's native spans with a strict lifecycle, and finished spans are
//! delivered to a collector asynchronously by the companion
//! `otbridge-collector` crate. Engines can be linked in or loaded from a
//! vendor plugin at runtime via `otbridge-dynamic`.
//!
//! ## Overview
//!
//! The framework consists of three main traits:
//!
//! * [`engine::Tracer`] is the capability a tracing library supplies: span
//!   creation, context serialization, flushing.
//! * [`driver::Driver`] is one vendor integration; its provided
//!   [`driver::Driver::start_span`] runs extraction and wraps engine spans.
//! * [`propagation::Extractor`] / [`propagation::Injector`] abstract the
//!   host's header carriers.
//!
//! Tracing is best-effort throughout: per-request propagation failures are
//! logged and counted but never fail the request, and a tracer that declines
//! a request yields a null [`span::Span`] rather than an error.
//!
//! ## Threading
//!
//! One event-loop thread per worker. Tracer state lives in
//! [`slot::ThreadLocalSlot`]s specifically to keep the span-creation hot
//! path free of locks; the only cross-thread state is the immutable
//! [`config::DriverConfig`] captured at construction.

pub mod codec;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod noop;
pub mod propagation;
pub mod registry;
pub mod slot;
pub mod span;
pub mod stats;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{ClusterInfo, ClusterSet, DriverConfig, NoOverrides, PropagationMode, RuntimeOverrides};
pub use driver::{Driver, SpanConfig};
pub use engine::{Decision, EngineSpan, SpanContext, Tracer};
pub use error::{ConfigError, Error, PropagationError};
pub use registry::{DriverContext, DriverRegistry};
pub use slot::ThreadLocalSlot;
pub use span::Span;
pub use stats::{Counter, ReporterStats, TracerStats};
