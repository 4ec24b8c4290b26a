//! Async collector transport.
//!
//! [`CollectorTransport::send`] issues one non-blocking gRPC unary call and
//! returns immediately; the completion closure fires later, exactly once,
//! never synchronously within `send`, on the same thread that issued the
//! call. A transport belongs to one worker thread and carries at most one
//! call at a time; issuing a second `send` while one is outstanding is a
//! caller protocol violation and is not defended against internally.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Uri};
use prost::Message;
use tracing::debug;

use otbridge::config::RuntimeOverrides;
use otbridge::stats::Counter;

use crate::client::HttpClient;
use crate::error::TransportError;
use crate::grpc;
use crate::grpc::GrpcMethod;

/// Runtime override key bounding one collector call.
pub const REQUEST_TIMEOUT_KEY: &str = "tracing.collector.request_timeout_ms";

/// Health counters for one transport. `total` increments on every completed
/// attempt, success or failure.
#[derive(Debug, Default)]
pub struct TransportStats {
    pub success: Counter,
    pub failure: Counter,
    pub total: Counter,
}

/// Per-thread collector call issuer.
pub struct CollectorTransport {
    client: Arc<dyn HttpClient>,
    endpoint: Uri,
    method: Arc<GrpcMethod>,
    overrides: Arc<dyn RuntimeOverrides>,
    default_timeout_ms: u64,
    stats: Arc<TransportStats>,
    in_flight: Rc<Cell<bool>>,
}

impl CollectorTransport {
    pub fn new(
        client: Arc<dyn HttpClient>,
        endpoint: Uri,
        method: Arc<GrpcMethod>,
        overrides: Arc<dyn RuntimeOverrides>,
        default_timeout_ms: u64,
    ) -> Self {
        CollectorTransport {
            client,
            endpoint,
            method,
            overrides,
            default_timeout_ms,
            stats: Arc::new(TransportStats::default()),
            in_flight: Rc::new(Cell::new(false)),
        }
    }

    pub fn stats(&self) -> &Arc<TransportStats> {
        &self.stats
    }

    /// Issue the report call and record `completion` for its outcome.
    ///
    /// Exactly one completion fires per call, on this thread, after `send`
    /// has returned. Must be called from within a `tokio::task::LocalSet`
    /// on the owning worker thread.
    pub fn send<Req, Resp, F>(&self, request: &Req, completion: F)
    where
        Req: Message,
        Resp: Message + Default + 'static,
        F: FnOnce(Result<Resp, TransportError>) + 'static,
    {
        debug_assert!(
            !self.in_flight.get(),
            "a collector call is already outstanding on this transport"
        );
        self.in_flight.set(true);

        let timeout = Duration::from_millis(
            self.overrides
                .get_u64(REQUEST_TIMEOUT_KEY, self.default_timeout_ms),
        );
        let request =
            grpc::prepare_request(&self.endpoint, &self.method, timeout, grpc::frame_request(request));

        let client = self.client.clone();
        let stats = self.stats.clone();
        let in_flight = self.in_flight.clone();
        tokio::task::spawn_local(async move {
            let result = match request {
                Ok(request) => call::<Resp>(&*client, request, timeout).await,
                Err(err) => Err(err),
            };
            in_flight.set(false);
            stats.total.inc();
            match &result {
                Ok(_) => stats.success.inc(),
                Err(error) => {
                    debug!(%error, "collector report failed");
                    stats.failure.inc();
                }
            }
            completion(result);
        });
    }
}

impl std::fmt::Debug for CollectorTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorTransport")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("in_flight", &self.in_flight.get())
            .finish()
    }
}

async fn call<Resp: Message + Default>(
    client: &dyn HttpClient,
    request: Request<Bytes>,
    timeout: Duration,
) -> Result<Resp, TransportError> {
    let response = tokio::time::timeout(timeout, client.send_bytes(request))
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
        .map_err(|err| TransportError::Connect(err.to_string()))?;
    grpc::decode_response(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpError;
    use async_trait::async_trait;
    use http::{Response, StatusCode};
    use otbridge::config::NoOverrides;
    use std::cell::RefCell;
    use std::sync::Mutex;

    #[derive(Clone, PartialEq, prost::Message)]
    struct ReportAck {
        #[prost(uint64, tag = "1")]
        received_spans: u64,
    }

    #[derive(Debug)]
    enum Reply {
        Respond(StatusCode, Bytes),
        Fail(String),
        Hang,
    }

    #[derive(Debug)]
    struct MockClient {
        reply: Mutex<Reply>,
    }

    impl MockClient {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(MockClient {
                reply: Mutex::new(reply),
            })
        }
    }

    #[async_trait]
    impl HttpClient for MockClient {
        async fn send_bytes(
            &self,
            _request: Request<Bytes>,
        ) -> Result<Response<Bytes>, HttpError> {
            let response = {
                let reply = self.reply.lock().unwrap();
                match &*reply {
                    Reply::Respond(status, body) => Some(Ok(Response::builder()
                        .status(*status)
                        .body(body.clone())
                        .unwrap())),
                    Reply::Fail(reason) => Some(Err(reason.clone().into())),
                    Reply::Hang => None,
                }
            };
            match response {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }
    }

    fn transport(client: Arc<dyn HttpClient>) -> CollectorTransport {
        CollectorTransport::new(
            client,
            "http://collector:8360".parse().unwrap(),
            Arc::new(GrpcMethod::new("collector.CollectorService", "Report")),
            Arc::new(NoOverrides),
            5000,
        )
    }

    fn send_and_collect(
        transport: &CollectorTransport,
    ) -> Rc<RefCell<Vec<Result<ReportAck, TransportError>>>> {
        let outcomes: Rc<RefCell<Vec<Result<ReportAck, TransportError>>>> =
            Rc::new(RefCell::new(Vec::new()));
        let sink = outcomes.clone();
        transport.send(&ReportAck::default(), move |result| {
            sink.borrow_mut().push(result);
        });
        // `send` must never deliver a completion synchronously.
        assert!(outcomes.borrow().is_empty());
        outcomes
    }

    async fn settled(outcomes: &Rc<RefCell<Vec<Result<ReportAck, TransportError>>>>) {
        while outcomes.borrow().is_empty() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn successful_report_completes_once() {
        let ack = ReportAck { received_spans: 3 };
        let client = MockClient::new(Reply::Respond(StatusCode::OK, grpc::frame_request(&ack)));
        let transport = transport(client);

        tokio::task::LocalSet::new()
            .run_until(async {
                let outcomes = send_and_collect(&transport);
                settled(&outcomes).await;

                let outcomes = outcomes.borrow();
                assert_eq!(outcomes.len(), 1, "completion fires exactly once");
                assert_eq!(outcomes[0].as_ref().unwrap(), &ack);
            })
            .await;

        assert_eq!(transport.stats().success.value(), 1);
        assert_eq!(transport.stats().failure.value(), 0);
        assert_eq!(transport.stats().total.value(), 1);
    }

    #[tokio::test]
    async fn malformed_response_is_a_counted_failure() {
        let client = MockClient::new(Reply::Respond(
            StatusCode::OK,
            Bytes::from_static(b"\0\0\0\0\x03"),
        ));
        let transport = transport(client);

        tokio::task::LocalSet::new()
            .run_until(async {
                let outcomes = send_and_collect(&transport);
                settled(&outcomes).await;

                let outcomes = outcomes.borrow();
                assert_eq!(outcomes.len(), 1, "never both callbacks, never twice");
                assert!(matches!(
                    outcomes[0],
                    Err(TransportError::MalformedResponse(_))
                ));
            })
            .await;

        assert_eq!(transport.stats().success.value(), 0);
        assert_eq!(transport.stats().failure.value(), 1);
        assert_eq!(transport.stats().total.value(), 1);
    }

    #[tokio::test]
    async fn unreachable_collector_is_a_counted_failure() {
        let client = MockClient::new(Reply::Fail("connection refused".to_string()));
        let transport = transport(client);

        tokio::task::LocalSet::new()
            .run_until(async {
                let outcomes = send_and_collect(&transport);
                settled(&outcomes).await;
                assert!(matches!(
                    outcomes.borrow()[0],
                    Err(TransportError::Connect(_))
                ));
            })
            .await;

        assert_eq!(transport.stats().failure.value(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_collector_call_times_out() {
        let client = MockClient::new(Reply::Hang);
        let transport = transport(client);

        tokio::task::LocalSet::new()
            .run_until(async {
                let outcomes = send_and_collect(&transport);
                // Let the call task start and arm its timeout before moving
                // the clock past the deadline.
                for _ in 0..4 {
                    tokio::task::yield_now().await;
                }
                tokio::time::advance(Duration::from_millis(5001)).await;
                settled(&outcomes).await;
                assert!(matches!(
                    outcomes.borrow()[0],
                    Err(TransportError::Timeout(timeout)) if timeout == Duration::from_millis(5000)
                ));
            })
            .await;

        assert_eq!(transport.stats().failure.value(), 1);
        assert_eq!(transport.stats().total.value(), 1);
    }

    #[tokio::test]
    async fn transport_is_reusable_after_completion() {
        let ack = ReportAck::default();
        let client = MockClient::new(Reply::Respond(StatusCode::OK, grpc::frame_request(&ack)));
        let transport = transport(client);

        tokio::task::LocalSet::new()
            .run_until(async {
                for _ in 0..2 {
                    let outcomes = send_and_collect(&transport);
                    settled(&outcomes).await;
                }
            })
            .await;

        assert_eq!(transport.stats().total.value(), 2);
    }
}
