//! No-op tracer engine.
//!
//! Returned wherever a driver must hand out a tracer before a real engine is
//! available. Spans are created and can be operated on, but nothing is
//! recorded, nothing is propagated and flushing does nothing.

use std::any::Any;
use std::time::SystemTime;

use crate::engine::{Decision, EngineSpan, SpanContext, Tracer};
use crate::error::PropagationError;
use crate::propagation::{Extractor, Injector};

/// A no-op instance of a tracer engine.
#[derive(Clone, Debug, Default)]
pub struct NoopTracer {
    _private: (),
}

impl NoopTracer {
    /// Create a new no-op tracer engine.
    pub fn new() -> Self {
        NoopTracer { _private: () }
    }
}

#[derive(Debug)]
struct NoopSpanContext;

impl SpanContext for NoopSpanContext {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct NoopSpan {
    context: NoopSpanContext,
}

impl EngineSpan for NoopSpan {
    fn context(&self) -> &dyn SpanContext {
        &self.context
    }

    /// Ignores name changes.
    fn set_operation(&mut self, _operation: &str) {}

    /// Ignores all tags.
    fn set_tag(&mut self, _name: &str, _value: &str) {}

    /// Ignores all log events.
    fn log(&mut self, _timestamp: SystemTime, _event: &str) {}

    /// Ignores sampling overrides.
    fn set_sampled(&mut self, _sampled: bool) {}

    fn finish(&mut self) {}
}

impl Tracer for NoopTracer {
    fn start_span(
        &self,
        _operation: &str,
        _parent: Option<&dyn SpanContext>,
        _start_time: SystemTime,
        _decision: Decision,
    ) -> Option<Box<dyn EngineSpan>> {
        Some(Box::new(NoopSpan {
            context: NoopSpanContext,
        }))
    }

    fn inject_binary(&self, _context: &dyn SpanContext) -> Result<Vec<u8>, PropagationError> {
        Ok(Vec::new())
    }

    fn extract_binary(
        &self,
        _serialized: &[u8],
    ) -> Result<Box<dyn SpanContext>, PropagationError> {
        Ok(Box::new(NoopSpanContext))
    }

    fn inject_headers(
        &self,
        _context: &dyn SpanContext,
        _injector: &mut dyn Injector,
    ) -> Result<(), PropagationError> {
        Ok(())
    }

    fn extract_headers(
        &self,
        _extractor: &dyn Extractor,
    ) -> Result<Option<Box<dyn SpanContext>>, PropagationError> {
        Ok(None)
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_spans_are_inert() {
        let tracer = NoopTracer::new();
        let mut span = tracer
            .start_span(
                "operation",
                None,
                SystemTime::now(),
                Decision { traced: true },
            )
            .expect("noop tracer always produces a span");
        span.set_tag("key", "value");
        span.set_operation("renamed");
        span.set_sampled(false);
        span.finish();
    }

    #[test]
    fn noop_extraction_finds_no_parent() {
        let tracer = NoopTracer::new();
        let carrier = std::collections::HashMap::<String, String>::new();
        assert!(tracer.extract_headers(&carrier).unwrap().is_none());
    }
}
