//! gRPC unary framing over a plain HTTP client.
//!
//! The collector protocol is a gRPC-framed call whose request and response
//! bodies are opaque vendor-protocol messages, so the transport frames
//! requests by hand instead of pulling in a full gRPC client stack: a
//! length-prefixed prost payload in an HTTP/2 POST, and the inverse on the
//! way back.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use http::{header, Method, Request, Response, StatusCode, Uri};
use prost::Message;

use crate::error::TransportError;

const GRPC_CONTENT_TYPE: &str = "application/grpc";
const GRPC_STATUS_HEADER: &str = "grpc-status";
/// Bytes preceding every gRPC message: compression flag + payload length.
const GRPC_FRAME_HEADER_LEN: usize = 5;

/// Fully qualified service and method of the collector's report call,
/// e.g. `lightstep.collector.CollectorService` / `Report`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GrpcMethod {
    service: String,
    method: String,
}

impl GrpcMethod {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        GrpcMethod {
            service: service.into(),
            method: method.into(),
        }
    }

    /// The HTTP/2 request path for this method.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

/// Length-prefix a serialized message for the wire.
pub fn frame_request<T: Message>(message: &T) -> Bytes {
    let payload = message.encode_to_vec();
    let mut framed = BytesMut::with_capacity(GRPC_FRAME_HEADER_LEN + payload.len());
    framed.put_u8(0);
    framed.put_u32(payload.len() as u32);
    framed.put_slice(&payload);
    framed.freeze()
}

/// Build the unary call request against `endpoint`.
pub fn prepare_request(
    endpoint: &Uri,
    method: &GrpcMethod,
    timeout: Duration,
    body: Bytes,
) -> Result<Request<Bytes>, TransportError> {
    let mut parts = endpoint.clone().into_parts();
    parts.path_and_query = Some(
        method
            .path()
            .parse()
            .map_err(|_| TransportError::InvalidRequest(format!("bad method path {method:?}")))?,
    );
    let uri = Uri::from_parts(parts)
        .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;

    Ok(Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, GRPC_CONTENT_TYPE)
        .header(header::TE, "trailers")
        .header("grpc-timeout", format!("{}m", timeout.as_millis()))
        .body(body)?)
}

/// Validate a collector response and decode its body into the expected
/// message type.
pub fn decode_response<R: Message + Default>(
    response: Response<Bytes>,
) -> Result<R, TransportError> {
    if response.status() != StatusCode::OK {
        return Err(TransportError::HttpStatus(response.status().as_u16()));
    }
    // A trailers-only response carries grpc-status in the header block.
    if let Some(status) = response.headers().get(GRPC_STATUS_HEADER) {
        let code = status
            .to_str()
            .ok()
            .and_then(|text| text.parse::<u32>().ok())
            .ok_or_else(|| {
                TransportError::MalformedResponse("unreadable grpc-status".to_string())
            })?;
        if code != 0 {
            return Err(TransportError::GrpcStatus(code));
        }
    }

    let body = response.into_body();
    if body.len() < GRPC_FRAME_HEADER_LEN {
        return Err(TransportError::MalformedResponse(
            "response shorter than a gRPC frame header".to_string(),
        ));
    }
    if body[0] != 0 {
        return Err(TransportError::MalformedResponse(
            "compressed responses are not supported".to_string(),
        ));
    }
    let length = u32::from_be_bytes([body[1], body[2], body[3], body[4]]) as usize;
    let payload = body
        .get(GRPC_FRAME_HEADER_LEN..GRPC_FRAME_HEADER_LEN + length)
        .ok_or_else(|| {
            TransportError::MalformedResponse("frame length exceeds response body".to_string())
        })?;
    R::decode(payload).map_err(|err| TransportError::MalformedResponse(err.to_string()))
}
