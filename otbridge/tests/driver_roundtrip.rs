//! End-to-end propagation: inbound headers through `start_span` to the
//! outbound injected headers, across simulated process hops.

use std::collections::HashMap;
use std::time::SystemTime;

use otbridge::codec::{decode_span_context, encode_span_context, OT_SPAN_CONTEXT_HEADER};
use otbridge::propagation::{Extractor, Injector};
use otbridge::testing::TestDriver;
use otbridge::{Decision, Driver, PropagationMode, SpanConfig};

fn start(driver: &TestDriver, headers: &HashMap<String, String>) -> otbridge::Span {
    driver.start_span(
        &SpanConfig::default(),
        headers,
        "ingress",
        SystemTime::UNIX_EPOCH,
        Decision { traced: true },
    )
}

fn trace_id_of(header_value: &str) -> u64 {
    let serialized = decode_span_context(header_value).expect("outbound header must be base64");
    let text = String::from_utf8(serialized).unwrap();
    let (trace_id, _span_id) = text.split_once(':').unwrap();
    u64::from_str_radix(trace_id, 16).unwrap()
}

#[test]
fn ingress_span_forwards_inbound_trace_id() {
    let driver = TestDriver::default();

    let mut inbound = HashMap::new();
    inbound.set(OT_SPAN_CONTEXT_HEADER, encode_span_context(b"f00d:1"));

    let span = start(&driver, &inbound);
    assert!(!span.is_null());

    let mut outbound = HashMap::new();
    span.inject_context(&mut outbound);

    let header = Extractor::get(&outbound, OT_SPAN_CONTEXT_HEADER)
        .expect("single-header injection always sets the inline header");
    assert_eq!(trace_id_of(header), 0xf00d);
}

#[test]
fn injection_overwrites_prior_header_value() {
    let driver = TestDriver::default();
    let span = start(&driver, &HashMap::new());

    let mut outbound = HashMap::new();
    outbound.set(OT_SPAN_CONTEXT_HEADER, "stale".to_string());
    span.inject_context(&mut outbound);

    let header = Extractor::get(&outbound, OT_SPAN_CONTEXT_HEADER).unwrap();
    assert_ne!(header, "stale");
    assert!(decode_span_context(header).is_ok());
}

#[test]
fn trace_continues_across_a_hop() {
    // First process starts a root span and injects outbound headers.
    let upstream = TestDriver::default();
    let root = start(&upstream, &HashMap::new());
    let mut wire = HashMap::new();
    root.inject_context(&mut wire);

    // Second process extracts those headers as its parent.
    let downstream = TestDriver::default();
    let mut span = start(&downstream, &wire);
    span.finish();

    let mut root = root;
    root.finish();

    let upstream_spans = upstream.recorder().finished_spans();
    let downstream_spans = downstream.recorder().finished_spans();
    assert_eq!(
        downstream_spans[0].trace_id,
        upstream_spans[0].trace_id,
        "causal lineage must survive encode/decode"
    );
    assert_eq!(
        downstream_spans[0].parent_span_id,
        Some(upstream_spans[0].span_id)
    );
}

#[test]
fn dual_mode_hop_is_extractable_from_native_headers_alone() {
    let upstream = TestDriver::new(PropagationMode::Dual, true);
    let root = start(&upstream, &HashMap::new());
    let mut wire = HashMap::new();
    root.inject_context(&mut wire);

    // A downstream that never saw the inline header still finds the parent
    // through the tracer-native keys.
    let mut native_only: HashMap<String, String> = HashMap::new();
    for key in Extractor::keys(&wire) {
        if key != OT_SPAN_CONTEXT_HEADER {
            let value = Extractor::get(&wire, key).unwrap().to_string();
            native_only.set(key, value);
        }
    }

    let downstream = TestDriver::default();
    let mut span = start(&downstream, &native_only);
    span.finish();

    let mut root = root;
    root.finish();

    assert_eq!(
        downstream.recorder().finished_spans()[0].trace_id,
        upstream.recorder().finished_spans()[0].trace_id
    );
}

#[test]
fn headerless_request_starts_a_fresh_trace() {
    let driver = TestDriver::default();
    let mut first = start(&driver, &HashMap::new());
    let mut second = start(&driver, &HashMap::new());
    first.finish();
    second.finish();

    let finished = driver.recorder().finished_spans();
    assert_ne!(finished[0].trace_id, finished[1].trace_id);
    assert_eq!(finished[0].parent_span_id, None);
    assert_eq!(finished[1].parent_span_id, None);
}
