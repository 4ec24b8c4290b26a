//! In-memory test doubles for the engine and driver seams.
//!
//! `RecordingTracer` is a minimal but fully functional tracer engine: ids are
//! handed out from a counter, contexts serialize to `trace:span` hex text,
//! the native header format uses the `ot-tracer-*` keys, and finished spans
//! are captured for inspection. It exists for tests in this workspace and is
//! not a real tracing backend.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::PropagationMode;
use crate::driver::Driver;
use crate::engine::{Decision, EngineSpan, SpanContext, Tracer};
use crate::error::PropagationError;
use crate::propagation::{Extractor, Injector};
use crate::stats::TracerStats;

/// Native multi-header keys recognized by [`RecordingTracer`].
pub const TRACE_ID_HEADER: &str = "ot-tracer-traceid";
pub const SPAN_ID_HEADER: &str = "ot-tracer-spanid";

/// Context token of the test engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TestSpanContext {
    pub trace_id: u64,
    pub span_id: u64,
}

impl SpanContext for TestSpanContext {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A span captured when it finished.
#[derive(Clone, Debug)]
pub struct FinishedSpan {
    pub operation: String,
    pub trace_id: u64,
    pub span_id: u64,
    pub parent_span_id: Option<u64>,
    pub tags: Vec<(String, String)>,
    pub logs: Vec<(SystemTime, String)>,
    pub sampled: bool,
    pub start_time: SystemTime,
}

#[derive(Debug, Default)]
struct RecorderState {
    next_id: Cell<u64>,
    finished: RefCell<Vec<FinishedSpan>>,
    decline: Cell<bool>,
    flushes: Cell<u64>,
}

impl RecorderState {
    fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

/// In-memory tracer engine.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    state: Rc<RecorderState>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `start_span` calls decline, as a tracer with sampling
    /// fully disabled would.
    pub fn set_decline(&self, decline: bool) {
        self.state.decline.set(decline);
    }

    /// Spans finished so far, in finish order.
    pub fn finished_spans(&self) -> Vec<FinishedSpan> {
        self.state.finished.borrow().clone()
    }

    /// Number of `flush` calls observed.
    pub fn flush_count(&self) -> u64 {
        self.state.flushes.get()
    }
}

fn parse_id(text: &str) -> Result<u64, PropagationError> {
    u64::from_str_radix(text, 16)
        .map_err(|_| PropagationError::Extract(format!("malformed id {text:?}")))
}

struct RecordingSpan {
    state: Rc<RecorderState>,
    context: TestSpanContext,
    record: FinishedSpan,
}

impl EngineSpan for RecordingSpan {
    fn context(&self) -> &dyn SpanContext {
        &self.context
    }

    fn set_operation(&mut self, operation: &str) {
        self.record.operation = operation.to_string();
    }

    fn set_tag(&mut self, name: &str, value: &str) {
        self.record.tags.push((name.to_string(), value.to_string()));
    }

    fn log(&mut self, timestamp: SystemTime, event: &str) {
        self.record.logs.push((timestamp, event.to_string()));
    }

    fn set_sampled(&mut self, sampled: bool) {
        self.record.sampled = sampled;
    }

    fn finish(&mut self) {
        self.state.finished.borrow_mut().push(self.record.clone());
    }
}

impl Tracer for RecordingTracer {
    fn start_span(
        &self,
        operation: &str,
        parent: Option<&dyn SpanContext>,
        start_time: SystemTime,
        decision: Decision,
    ) -> Option<Box<dyn EngineSpan>> {
        if self.state.decline.get() {
            return None;
        }
        let parent = parent.and_then(|ctx| ctx.as_any().downcast_ref::<TestSpanContext>());
        let context = TestSpanContext {
            trace_id: parent.map_or_else(|| self.state.next_id(), |p| p.trace_id),
            span_id: self.state.next_id(),
        };
        Some(Box::new(RecordingSpan {
            state: self.state.clone(),
            context,
            record: FinishedSpan {
                operation: operation.to_string(),
                trace_id: context.trace_id,
                span_id: context.span_id,
                parent_span_id: parent.map(|p| p.span_id),
                tags: Vec::new(),
                logs: Vec::new(),
                sampled: decision.traced,
                start_time,
            },
        }))
    }

    fn inject_binary(&self, context: &dyn SpanContext) -> Result<Vec<u8>, PropagationError> {
        let context = context
            .as_any()
            .downcast_ref::<TestSpanContext>()
            .ok_or_else(|| PropagationError::Inject("foreign span context".to_string()))?;
        Ok(format!("{:x}:{:x}", context.trace_id, context.span_id).into_bytes())
    }

    fn extract_binary(&self, serialized: &[u8]) -> Result<Box<dyn SpanContext>, PropagationError> {
        let text = std::str::from_utf8(serialized)
            .map_err(|_| PropagationError::Extract("span context is not utf-8".to_string()))?;
        let (trace_id, span_id) = text
            .split_once(':')
            .ok_or_else(|| PropagationError::Extract(format!("malformed context {text:?}")))?;
        Ok(Box::new(TestSpanContext {
            trace_id: parse_id(trace_id)?,
            span_id: parse_id(span_id)?,
        }))
    }

    fn inject_headers(
        &self,
        context: &dyn SpanContext,
        injector: &mut dyn Injector,
    ) -> Result<(), PropagationError> {
        let context = context
            .as_any()
            .downcast_ref::<TestSpanContext>()
            .ok_or_else(|| PropagationError::Inject("foreign span context".to_string()))?;
        injector.set(TRACE_ID_HEADER, format!("{:x}", context.trace_id));
        injector.set(SPAN_ID_HEADER, format!("{:x}", context.span_id));
        Ok(())
    }

    fn extract_headers(
        &self,
        extractor: &dyn Extractor,
    ) -> Result<Option<Box<dyn SpanContext>>, PropagationError> {
        let (trace_id, span_id) = match (
            extractor.get(TRACE_ID_HEADER),
            extractor.get(SPAN_ID_HEADER),
        ) {
            (Some(trace_id), Some(span_id)) => (trace_id, span_id),
            _ => return Ok(None),
        };
        Ok(Some(Box::new(TestSpanContext {
            trace_id: parse_id(trace_id)?,
            span_id: parse_id(span_id)?,
        })))
    }

    fn flush(&self) {
        self.state.flushes.set(self.state.flushes.get() + 1);
    }
}

/// Single-threaded driver around a [`RecordingTracer`], for exercising the
/// generic orchestration without a collector or a worker pool.
#[derive(Debug)]
pub struct TestDriver {
    tracer: Rc<RecordingTracer>,
    propagation_mode: PropagationMode,
    drop_logs: bool,
    stats: Arc<TracerStats>,
}

impl TestDriver {
    pub fn new(propagation_mode: PropagationMode, drop_logs: bool) -> Self {
        TestDriver {
            tracer: Rc::new(RecordingTracer::new()),
            propagation_mode,
            drop_logs,
            stats: Arc::new(TracerStats::default()),
        }
    }

    pub fn recorder(&self) -> &RecordingTracer {
        &self.tracer
    }
}

impl Default for TestDriver {
    fn default() -> Self {
        Self::new(PropagationMode::SingleHeader, true)
    }
}

impl Driver for TestDriver {
    fn tracer(&self) -> Rc<dyn Tracer> {
        self.tracer.clone()
    }

    fn propagation_mode(&self) -> PropagationMode {
        self.propagation_mode
    }

    fn drop_logs(&self) -> bool {
        self.drop_logs
    }

    fn tracer_stats(&self) -> &Arc<TracerStats> {
        &self.stats
    }
}
