//! The tracer engine seam.
//!
//! A tracing library implementing these traits can hook into the driver
//! framework with a minimal amount of effort: the engine only supplies span
//! creation, context serialization and flushing, and the rest of span
//! bookkeeping and propagation is taken care of by [`crate::driver`] and
//! [`crate::span`].
//!
//! Engines are owned per worker thread (see [`crate::slot`]) and are never
//! shared, so none of these traits require `Send` or `Sync`.

use std::any::Any;
use std::fmt;
use std::time::SystemTime;

use crate::error::PropagationError;
use crate::propagation::{Extractor, Injector};

/// Opaque serializable token identifying a span for causal linkage.
///
/// Contexts are produced by the tracer engine, either from an active span or
/// by extracting inbound headers, and are handed back to the same engine
/// when starting children or injecting outbound headers. The framework never
/// constructs or inspects one.
pub trait SpanContext: fmt::Debug {
    /// Downcast support for the owning engine.
    fn as_any(&self) -> &dyn Any;
}

/// The host's sampling verdict for a request, made before span creation.
/// Engines may honor or override it; [`crate::span::Span::set_sampled`]
/// overrides it after the fact.
#[derive(Clone, Copy, Debug)]
pub struct Decision {
    pub traced: bool,
}

/// One tracer-native span. All mutations are forwarded from the owning
/// [`crate::span::Span`], which enforces the lifecycle.
pub trait EngineSpan {
    /// Context token linking children to this span.
    fn context(&self) -> &dyn SpanContext;

    /// Rename the operation.
    fn set_operation(&mut self, operation: &str);

    /// Attach or replace a tag.
    fn set_tag(&mut self, name: &str, value: &str);

    /// Record a timestamped log event.
    fn log(&mut self, timestamp: SystemTime, event: &str);

    /// Override the sampling decision for this span.
    fn set_sampled(&mut self, sampled: bool);

    /// Mark the span finished. Called at most once.
    fn finish(&mut self);
}

/// A tracer engine: the per-vendor capability the framework drives.
pub trait Tracer {
    /// Start a span, optionally as a child of `parent`.
    ///
    /// Returning `None` means the engine declines to trace this request.
    /// That is a valid, expected outcome (the caller receives a null span),
    /// not an error.
    fn start_span(
        &self,
        operation: &str,
        parent: Option<&dyn SpanContext>,
        start_time: SystemTime,
        decision: Decision,
    ) -> Option<Box<dyn EngineSpan>>;

    /// Serialize a context with the engine's binary writer.
    fn inject_binary(&self, context: &dyn SpanContext) -> Result<Vec<u8>, PropagationError>;

    /// Deserialize a context previously produced by [`Tracer::inject_binary`]
    /// on a compatible engine.
    fn extract_binary(&self, serialized: &[u8]) -> Result<Box<dyn SpanContext>, PropagationError>;

    /// Write the engine's native header representation of `context`. May set
    /// zero or more vendor-specific headers.
    fn inject_headers(
        &self,
        context: &dyn SpanContext,
        injector: &mut dyn Injector,
    ) -> Result<(), PropagationError>;

    /// Scan the complete header set with the engine's native reader. The
    /// engine recognizes its own subset of keys; `Ok(None)` means no parent
    /// was found, which is not an error.
    fn extract_headers(
        &self,
        extractor: &dyn Extractor,
    ) -> Result<Option<Box<dyn SpanContext>>, PropagationError>;

    /// Deliver buffered finished spans to the engine's reporter.
    fn flush(&self);
}
