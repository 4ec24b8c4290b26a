//! # Span
//!
//! A [`Span`] wraps one tracer-native span and enforces its lifecycle:
//! Created → Active → Finished, with Finished terminal. The wrapper is owned
//! exclusively by the request that created it and is never shared across
//! threads.
//!
//! A span can also be *null*: the engine declined to produce a span, which
//! is the expected "tracing disabled for this request" outcome. Null spans
//! accept every operation and do nothing.

use std::rc::Rc;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::warn;

use crate::codec::{encode_span_context, OT_SPAN_CONTEXT_HEADER};
use crate::config::PropagationMode;
use crate::driver::SpanConfig;
use crate::engine::{Decision, EngineSpan, Tracer};
use crate::propagation::Injector;
use crate::stats::TracerStats;

struct SpanInner {
    engine_span: Box<dyn EngineSpan>,
    tracer: Rc<dyn Tracer>,
    propagation_mode: PropagationMode,
    drop_logs: bool,
    stats: Arc<TracerStats>,
}

/// Single operation within a trace.
pub struct Span {
    inner: Option<SpanInner>,
    finished: bool,
}

impl Span {
    pub(crate) fn new(
        engine_span: Box<dyn EngineSpan>,
        tracer: Rc<dyn Tracer>,
        propagation_mode: PropagationMode,
        drop_logs: bool,
        stats: Arc<TracerStats>,
    ) -> Self {
        Span {
            inner: Some(SpanInner {
                engine_span,
                tracer,
                propagation_mode,
                drop_logs,
                stats,
            }),
            finished: false,
        }
    }

    /// The span returned when the tracer declines to trace a request.
    /// Callers must tolerate it; every operation is a no-op.
    pub fn null() -> Self {
        Span {
            inner: None,
            finished: false,
        }
    }

    /// True when the engine declined to produce a span.
    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    fn active(&mut self) -> Option<&mut SpanInner> {
        if self.finished {
            return None;
        }
        self.inner.as_mut()
    }

    /// Attach or replace a tag on the span.
    pub fn set_tag(&mut self, name: &str, value: &str) {
        if let Some(inner) = self.active() {
            inner.engine_span.set_tag(name, value);
        }
    }

    /// Rename the operation.
    pub fn set_operation(&mut self, operation: &str) {
        if let Some(inner) = self.active() {
            inner.engine_span.set_operation(operation);
        }
    }

    /// Record a timestamped log event. No-op when the driver is configured
    /// to drop logs.
    pub fn log(&mut self, timestamp: SystemTime, event: &str) {
        if let Some(inner) = self.active() {
            if inner.drop_logs {
                return;
            }
            inner.engine_span.log(timestamp, event);
        }
    }

    /// Override the sampling decision, independent of the [`Decision`]
    /// supplied at start.
    pub fn set_sampled(&mut self, sampled: bool) {
        if let Some(inner) = self.active() {
            inner.engine_span.set_sampled(sampled);
        }
    }

    /// Start a new span causally linked to this span's context.
    pub fn spawn_child(
        &self,
        _config: &SpanConfig,
        operation: &str,
        start_time: SystemTime,
    ) -> Span {
        let inner = match &self.inner {
            Some(inner) => inner,
            None => return Span::null(),
        };
        let child = inner.tracer.start_span(
            operation,
            Some(inner.engine_span.context()),
            start_time,
            Decision { traced: true },
        );
        match child {
            Some(engine_span) => Span::new(
                engine_span,
                inner.tracer.clone(),
                inner.propagation_mode,
                inner.drop_logs,
                inner.stats.clone(),
            ),
            None => Span::null(),
        }
    }

    /// Write this span's context to outbound request headers, per the
    /// driver's propagation mode. Failures are logged and counted; the
    /// outbound call proceeds either way.
    pub fn inject_context(&self, injector: &mut dyn Injector) {
        let inner = match &self.inner {
            Some(inner) => inner,
            None => return,
        };
        let context = inner.engine_span.context();
        match inner.tracer.inject_binary(context) {
            Ok(serialized) => {
                injector.set(OT_SPAN_CONTEXT_HEADER, encode_span_context(&serialized));
            }
            Err(error) => {
                warn!(%error, "failed to inject span context");
                inner.stats.span_context_injection_error.inc();
            }
        }
        if inner.propagation_mode == PropagationMode::Dual {
            if let Err(error) = inner.tracer.inject_headers(context, injector) {
                warn!(%error, "failed to inject native span context headers");
                inner.stats.span_context_injection_error.inc();
            }
        }
    }

    /// Finish the span.
    ///
    /// Equivalent to [`Span::finish_with`] with a finalizer that does
    /// nothing.
    pub fn finish(&mut self) {
        self.finish_with(|_| {});
    }

    /// Run `finalizer` for duration/outcome accounting, then mark the
    /// underlying span finished.
    ///
    /// Finishing a span twice is a caller contract violation; the behavior
    /// is undefined.
    pub fn finish_with<F: FnOnce(&mut Span)>(&mut self, finalizer: F) {
        debug_assert!(!self.finished, "span finished twice");
        finalizer(self);
        self.finished = true;
        if let Some(inner) = self.inner.as_mut() {
            inner.engine_span.finish();
        }
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span")
            .field("null", &self.is_null())
            .field("finished", &self.finished)
            .finish()
    }
}
