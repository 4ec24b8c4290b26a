//! Driver orchestration.
//!
//! A [`Driver`] is one vendor integration: it resolves the worker thread's
//! tracer engine, runs inbound context extraction and wraps engine spans in
//! [`Span`]s. The generic orchestration lives in the provided
//! [`Driver::start_span`]; vendor drivers supply the capability surface
//! (`tracer`, `propagation_mode`, `drop_logs`, stats).

use std::rc::Rc;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::warn;

use crate::codec::{decode_span_context, OT_SPAN_CONTEXT_HEADER};
use crate::config::PropagationMode;
use crate::engine::{Decision, SpanContext, Tracer};
use crate::propagation::Extractor;
use crate::span::Span;
use crate::stats::TracerStats;

/// Request-scoped tracing directives supplied by the embedding host.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpanConfig {
    /// Whether the host wants verbose spans for this request.
    pub verbose: bool,
}

/// Per-vendor tracing integration.
///
/// Implementations are constructed once, hold immutable configuration and
/// are shared read-only across worker threads; the tracer itself is owned
/// per thread (see [`crate::slot`]).
pub trait Driver: std::fmt::Debug {
    /// The calling thread's tracer engine. Never invalid once the driver is
    /// constructed.
    fn tracer(&self) -> Rc<dyn Tracer>;

    /// Controls how span context is propagated in request headers.
    /// `SingleHeader` propagates the context as base64 within the inline
    /// header; `Dual` additionally uses the native format of the tracing
    /// library.
    fn propagation_mode(&self) -> PropagationMode {
        PropagationMode::SingleHeader
    }

    /// Whether span log events are suppressed globally.
    fn drop_logs(&self) -> bool {
        true
    }

    /// Counters charged by extraction and injection.
    fn tracer_stats(&self) -> &Arc<TracerStats>;

    /// Start a span for an inbound request.
    ///
    /// Extraction of a parent context follows a strict order: the inline
    /// base64 header first, then the engine's native reader over the
    /// complete header set, then no parent at all. Extraction failures are
    /// logged, counted and fall through to the next step; the request is
    /// never failed. If the engine declines to produce a span the returned
    /// span is null, which callers must tolerate.
    fn start_span(
        &self,
        _config: &SpanConfig,
        headers: &dyn Extractor,
        operation_name: &str,
        start_time: SystemTime,
        decision: Decision,
    ) -> Span {
        let tracer = self.tracer();
        let parent = extract_parent(&*tracer, headers, self.tracer_stats());
        match tracer.start_span(operation_name, parent.as_deref(), start_time, decision) {
            Some(engine_span) => Span::new(
                engine_span,
                tracer,
                self.propagation_mode(),
                self.drop_logs(),
                self.tracer_stats().clone(),
            ),
            None => Span::null(),
        }
    }
}

fn extract_parent(
    tracer: &dyn Tracer,
    headers: &dyn Extractor,
    stats: &TracerStats,
) -> Option<Box<dyn SpanContext>> {
    if let Some(value) = headers.get(OT_SPAN_CONTEXT_HEADER) {
        match decode_span_context(value).and_then(|serialized| tracer.extract_binary(&serialized))
        {
            Ok(context) => return Some(context),
            Err(error) => {
                warn!(%error, "failed to extract span context from inline header");
                stats.span_context_extraction_error.inc();
            }
        }
    }
    match tracer.extract_headers(headers) {
        Ok(parent) => parent,
        Err(error) => {
            warn!(%error, "failed to extract span context from native headers");
            stats.span_context_extraction_error.inc();
            None
        }
    }
}
