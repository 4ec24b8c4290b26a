//! Engine adapters over a loaded plugin's function table.

use std::any::Any;
use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use otbridge::engine::{Decision, EngineSpan, SpanContext, Tracer};
use otbridge::error::PropagationError;
use otbridge::propagation::{Extractor, Injector};

use crate::abi::{RawCarrierReader, RawCarrierWriter, RawContextHandle, RawSpanHandle};
use crate::loader::LoadedPlugin;

fn micros_since_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros() as u64)
        .unwrap_or(0)
}

/// Core tracer capability backed by a plugin table.
#[derive(Debug)]
pub struct DynamicTracer {
    plugin: Arc<LoadedPlugin>,
}

impl DynamicTracer {
    pub fn new(plugin: Arc<LoadedPlugin>) -> Rc<Self> {
        Rc::new(DynamicTracer { plugin })
    }
}

/// Context token owned by the plugin, released through its table.
#[derive(Debug)]
pub struct DynamicSpanContext {
    plugin: Arc<LoadedPlugin>,
    handle: RawContextHandle,
}

impl SpanContext for DynamicSpanContext {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for DynamicSpanContext {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            let api = self.plugin.api();
            unsafe { (api.release_context)(api.tracer, self.handle) };
        }
    }
}

struct DynamicSpan {
    plugin: Arc<LoadedPlugin>,
    handle: RawSpanHandle,
    context: DynamicSpanContext,
}

impl EngineSpan for DynamicSpan {
    fn context(&self) -> &dyn SpanContext {
        &self.context
    }

    fn set_operation(&mut self, operation: &str) {
        if let Ok(operation) = CString::new(operation) {
            unsafe { (self.plugin.api().set_operation)(self.handle, operation.as_ptr()) };
        }
    }

    fn set_tag(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (CString::new(name), CString::new(value)) {
            unsafe { (self.plugin.api().set_tag)(self.handle, name.as_ptr(), value.as_ptr()) };
        }
    }

    fn log(&mut self, timestamp: SystemTime, event: &str) {
        if let Ok(event) = CString::new(event) {
            unsafe {
                (self.plugin.api().log)(self.handle, micros_since_epoch(timestamp), event.as_ptr())
            };
        }
    }

    fn set_sampled(&mut self, sampled: bool) {
        unsafe { (self.plugin.api().set_sampled)(self.handle, sampled as c_int) };
    }

    fn finish(&mut self) {
        unsafe { (self.plugin.api().finish_span)(self.handle) };
    }
}

impl Drop for DynamicSpan {
    fn drop(&mut self) {
        unsafe { (self.plugin.api().release_span)(self.handle) };
    }
}

/// `set` callback of [`RawCarrierWriter`] over an [`Injector`].
unsafe extern "C" fn writer_set(carrier: *mut c_void, key: *const c_char, value: *const c_char) {
    let injector = &mut **(carrier as *mut &mut dyn Injector);
    let key = std::ffi::CStr::from_ptr(key);
    let value = std::ffi::CStr::from_ptr(value);
    if let (Ok(key), Ok(value)) = (key.to_str(), value.to_str()) {
        injector.set(key, value.to_string());
    }
}

/// `for_each` callback of [`RawCarrierReader`] over an [`Extractor`].
unsafe extern "C" fn reader_for_each(
    carrier: *const c_void,
    visitor: crate::abi::RawCarrierVisitor,
    state: *mut c_void,
) -> c_int {
    let extractor = *(carrier as *const &dyn Extractor);
    for key in extractor.keys() {
        let value = match extractor.get(key) {
            Some(value) => value,
            None => continue,
        };
        let (key, value) = match (CString::new(key), CString::new(value)) {
            (Ok(key), Ok(value)) => (key, value),
            _ => continue,
        };
        let code = visitor(state, key.as_ptr(), value.as_ptr());
        if code != 0 {
            return code;
        }
    }
    0
}

fn context_handle(context: &dyn SpanContext) -> Result<RawContextHandle, PropagationError> {
    context
        .as_any()
        .downcast_ref::<DynamicSpanContext>()
        .map(|context| context.handle)
        .ok_or_else(|| PropagationError::Inject("foreign span context".to_string()))
}

impl Tracer for DynamicTracer {
    fn start_span(
        &self,
        operation: &str,
        parent: Option<&dyn SpanContext>,
        start_time: SystemTime,
        decision: Decision,
    ) -> Option<Box<dyn EngineSpan>> {
        let operation = CString::new(operation).ok()?;
        let parent = parent
            .and_then(|context| context.as_any().downcast_ref::<DynamicSpanContext>())
            .map_or(ptr::null_mut(), |context| context.handle);

        let api = self.plugin.api();
        let handle = unsafe {
            (api.start_span)(
                api.tracer,
                operation.as_ptr(),
                parent,
                micros_since_epoch(start_time),
                decision.traced as c_int,
            )
        };
        if handle.is_null() {
            return None;
        }
        let context = DynamicSpanContext {
            plugin: self.plugin.clone(),
            handle: unsafe { (api.span_context)(api.tracer, handle) },
        };
        Some(Box::new(DynamicSpan {
            plugin: self.plugin.clone(),
            handle,
            context,
        }))
    }

    fn inject_binary(&self, context: &dyn SpanContext) -> Result<Vec<u8>, PropagationError> {
        let handle = context_handle(context)?;
        let api = self.plugin.api();
        let mut buf: *mut u8 = ptr::null_mut();
        let mut len: usize = 0;
        let code = unsafe { (api.inject_binary)(api.tracer, handle, &mut buf, &mut len) };
        if code != 0 || buf.is_null() {
            return Err(PropagationError::Inject(format!(
                "plugin writer failed with code {code}"
            )));
        }
        let serialized = unsafe { std::slice::from_raw_parts(buf, len) }.to_vec();
        unsafe { (api.release_buffer)(buf, len) };
        Ok(serialized)
    }

    fn extract_binary(&self, serialized: &[u8]) -> Result<Box<dyn SpanContext>, PropagationError> {
        let api = self.plugin.api();
        let mut handle: RawContextHandle = ptr::null_mut();
        let code = unsafe {
            (api.extract_binary)(api.tracer, serialized.as_ptr(), serialized.len(), &mut handle)
        };
        if code != 0 || handle.is_null() {
            return Err(PropagationError::Extract(format!(
                "plugin reader failed with code {code}"
            )));
        }
        Ok(Box::new(DynamicSpanContext {
            plugin: self.plugin.clone(),
            handle,
        }))
    }

    fn inject_headers(
        &self,
        context: &dyn SpanContext,
        injector: &mut dyn Injector,
    ) -> Result<(), PropagationError> {
        let handle = context_handle(context)?;
        let api = self.plugin.api();
        let mut injector = injector;
        let writer = RawCarrierWriter {
            carrier: &mut injector as *mut &mut dyn Injector as *mut c_void,
            set: writer_set,
        };
        let code = unsafe { (api.inject_headers)(api.tracer, handle, &writer) };
        if code != 0 {
            return Err(PropagationError::Inject(format!(
                "plugin native writer failed with code {code}"
            )));
        }
        Ok(())
    }

    fn extract_headers(
        &self,
        extractor: &dyn Extractor,
    ) -> Result<Option<Box<dyn SpanContext>>, PropagationError> {
        let api = self.plugin.api();
        let carrier: &dyn Extractor = extractor;
        let reader = RawCarrierReader {
            carrier: &carrier as *const &dyn Extractor as *const c_void,
            for_each: reader_for_each,
        };
        let mut handle: RawContextHandle = ptr::null_mut();
        let code = unsafe { (api.extract_headers)(api.tracer, &reader, &mut handle) };
        if code != 0 {
            return Err(PropagationError::Extract(format!(
                "plugin native reader failed with code {code}"
            )));
        }
        if handle.is_null() {
            return Ok(None);
        }
        Ok(Some(Box::new(DynamicSpanContext {
            plugin: self.plugin.clone(),
            handle,
        })))
    }

    fn flush(&self) {
        let api = self.plugin.api();
        unsafe { (api.flush)(api.tracer) };
    }
}
