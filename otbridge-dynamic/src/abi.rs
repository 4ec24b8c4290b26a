//! C ABI between the framework and a tracer plugin.
//!
//! The contract is owned by the plugin ecosystem, not this crate: a plugin
//! exports `int make_<basename>_tracer(const char* config_json,
//! void* tracer_out, void* error_out)` and, on success, stores a pointer to
//! a [`RawTracerApi`] in `tracer_out`. Every handle in the table is opaque
//! to the framework; the table's function pointers are the only way in.
//!
//! Plugins run in "no internal threading" mode: the framework confines each
//! use of the table to the worker thread driving it and adds no locking of
//! its own, so whatever internal state the plugin shares between handles is
//! the plugin's responsibility.

use std::os::raw::{c_char, c_int, c_void};

/// Opaque plugin-side tracer instance.
pub type RawTracerHandle = *mut c_void;
/// Opaque plugin-side span.
pub type RawSpanHandle = *mut c_void;
/// Opaque plugin-side span context.
pub type RawContextHandle = *mut c_void;

/// Outbound header carrier handed to the plugin's native writer.
#[repr(C)]
pub struct RawCarrierWriter {
    pub carrier: *mut c_void,
    /// Set `key` to `value` on the carrier, replacing any prior value.
    pub set:
        unsafe extern "C" fn(carrier: *mut c_void, key: *const c_char, value: *const c_char),
}

/// Visitor invoked once per header during native extraction. A nonzero
/// return aborts the iteration and is propagated out of `for_each`.
pub type RawCarrierVisitor =
    unsafe extern "C" fn(state: *mut c_void, key: *const c_char, value: *const c_char) -> c_int;

/// Inbound header carrier handed to the plugin's native reader.
#[repr(C)]
pub struct RawCarrierReader {
    pub carrier: *const c_void,
    pub for_each: unsafe extern "C" fn(
        carrier: *const c_void,
        visitor: RawCarrierVisitor,
        state: *mut c_void,
    ) -> c_int,
}

/// Function table a plugin's factory places in its `tracer_out` slot.
///
/// Ownership rules:
/// * span handles from `start_span` are released with `release_span`
///   (finishing does not release);
/// * context handles from `span_context`, `extract_binary` and
///   `extract_headers` are released with `release_context`;
/// * buffers from `inject_binary` are released with `release_buffer`;
/// * the table itself (and the tracer behind it) dies in `destroy`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawTracerApi {
    pub tracer: RawTracerHandle,

    /// Start a span. `parent` may be null. A null return means the tracer
    /// declines to trace this request.
    pub start_span: unsafe extern "C" fn(
        tracer: RawTracerHandle,
        operation: *const c_char,
        parent: RawContextHandle,
        start_micros: u64,
        sampled: c_int,
    ) -> RawSpanHandle,

    /// Context token of a live span. Owned by the caller, may be null.
    pub span_context:
        unsafe extern "C" fn(tracer: RawTracerHandle, span: RawSpanHandle) -> RawContextHandle,

    pub set_operation:
        unsafe extern "C" fn(span: RawSpanHandle, operation: *const c_char),
    pub set_tag:
        unsafe extern "C" fn(span: RawSpanHandle, name: *const c_char, value: *const c_char),
    pub log:
        unsafe extern "C" fn(span: RawSpanHandle, timestamp_micros: u64, event: *const c_char),
    pub set_sampled: unsafe extern "C" fn(span: RawSpanHandle, sampled: c_int),
    pub finish_span: unsafe extern "C" fn(span: RawSpanHandle),
    pub release_span: unsafe extern "C" fn(span: RawSpanHandle),

    /// Serialize `context`; 0 on success with `buf_out`/`len_out` set.
    pub inject_binary: unsafe extern "C" fn(
        tracer: RawTracerHandle,
        context: RawContextHandle,
        buf_out: *mut *mut u8,
        len_out: *mut usize,
    ) -> c_int,

    /// Deserialize a context; 0 on success with `context_out` set.
    pub extract_binary: unsafe extern "C" fn(
        tracer: RawTracerHandle,
        data: *const u8,
        len: usize,
        context_out: *mut RawContextHandle,
    ) -> c_int,

    /// Write the native header form of `context`; 0 on success.
    pub inject_headers: unsafe extern "C" fn(
        tracer: RawTracerHandle,
        context: RawContextHandle,
        writer: *const RawCarrierWriter,
    ) -> c_int,

    /// Scan headers with the native reader; 0 on success. `context_out`
    /// stays null when no parent was recognized.
    pub extract_headers: unsafe extern "C" fn(
        tracer: RawTracerHandle,
        reader: *const RawCarrierReader,
        context_out: *mut RawContextHandle,
    ) -> c_int,

    /// Deliver buffered spans to the plugin's reporter.
    pub flush: unsafe extern "C" fn(tracer: RawTracerHandle),

    pub release_context:
        unsafe extern "C" fn(tracer: RawTracerHandle, context: RawContextHandle),
    pub release_buffer: unsafe extern "C" fn(buf: *mut u8, len: usize),
    pub destroy: unsafe extern "C" fn(api: *mut RawTracerApi),
}

/// Factory signature resolved from the plugin library. The two out slots
/// are `void*` in the C contract; they are typed here as what each side
/// actually stores in them.
pub type TracerFactoryFn = unsafe extern "C" fn(
    config_json: *const c_char,
    tracer_out: *mut *mut RawTracerApi,
    error_out: *mut *mut c_char,
) -> c_int;
