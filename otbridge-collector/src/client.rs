//! HTTP client seam for collector calls.
//!
//! The transport issues byte-level requests through [`HttpClient`] so tests
//! and embedders can substitute their own async client; [`Http2Client`] is
//! the default hyper-backed implementation. Collector clusters are
//! HTTP/2-only (gRPC), so the default client speaks prior-knowledge HTTP/2
//! exclusively.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderValue, Request, Response};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

/// Error type returned by HTTP client implementations.
pub type HttpError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A minimal interface necessary for sending requests over HTTP.
///
/// Implementations send the request and return the complete response,
/// including the status code and collected body. Cancellation and timeouts
/// are the transport's concern, not the client's.
#[async_trait]
pub trait HttpClient: Debug + Send + Sync {
    /// Send the specified HTTP request with `Bytes` payload.
    async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError>;
}

/// Prior-knowledge HTTP/2 client over hyper's legacy connection pool.
#[derive(Clone, Debug)]
pub struct Http2Client {
    inner: Client<HttpConnector, Full<Bytes>>,
    authorization: Option<HeaderValue>,
}

impl Http2Client {
    pub fn new(authorization: Option<HeaderValue>) -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .http2_only(true)
            .build_http();
        Self {
            inner,
            authorization,
        }
    }
}

impl Default for Http2Client {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl HttpClient for Http2Client {
    async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
        let (parts, body) = request.into_parts();
        let mut request = Request::from_parts(parts, Full::from(body));
        if let Some(ref authorization) = self.authorization {
            request
                .headers_mut()
                .insert(http::header::AUTHORIZATION, authorization.clone());
        }
        let response = self.inner.request(request).await?;
        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, body.collect().await?.to_bytes()))
    }
}
