//! Collector-reporting driver.
//!
//! [`ReportingDriver`] wires the pieces together for an engine that buffers
//! finished spans and reports them to a remote collector: it resolves the
//! collector cluster at construction (failing fast on anything that cannot
//! carry gRPC), then builds one tracer engine per worker thread, each with
//! its own [`CollectorTransport`] and [`FlushTimer`].

use std::rc::Rc;
use std::sync::Arc;

use http::Uri;

use otbridge::config::{ClusterSet, DriverConfig, PropagationMode, RuntimeOverrides};
use otbridge::driver::Driver;
use otbridge::engine::Tracer;
use otbridge::error::ConfigError;
use otbridge::slot::ThreadLocalSlot;
use otbridge::stats::{ReporterStats, TracerStats};

use crate::client::HttpClient;
use crate::flush::FlushTimer;
use crate::grpc::GrpcMethod;
use crate::transport::CollectorTransport;

/// Everything an engine factory gets to build one worker thread's tracer.
pub struct EngineContext {
    /// The driver's immutable configuration.
    pub config: Arc<DriverConfig>,
    /// This thread's collector transport.
    pub transport: CollectorTransport,
    /// Counters the engine should charge when reports go out.
    pub reporter_stats: Arc<ReporterStats>,
}

/// Builds one tracer engine per worker thread. Must not block; runs on the
/// worker's event loop during slot initialization.
pub type EngineFactory = dyn Fn(EngineContext) -> Rc<dyn Tracer> + Send + Sync;

/// Per-thread slot entry: the engine plus the flush timer sharing its
/// lifetime.
pub struct ThreadTracer {
    tracer: Rc<dyn Tracer>,
    _flush_timer: FlushTimer,
}

/// Driver for engines that report buffered spans to a gRPC collector.
pub struct ReportingDriver {
    config: Arc<DriverConfig>,
    tracer_stats: Arc<TracerStats>,
    reporter_stats: Arc<ReporterStats>,
    slot: ThreadLocalSlot<ThreadTracer>,
}

impl ReportingDriver {
    /// Validate the collector cluster and set up per-thread construction.
    ///
    /// Fails when the configured cluster is unknown, lacks HTTP/2, or has an
    /// endpoint that is not an absolute URI. No engine is built until a
    /// worker thread first asks for its tracer.
    pub fn new(
        config: DriverConfig,
        clusters: &ClusterSet,
        overrides: Arc<dyn RuntimeOverrides>,
        client: Arc<dyn HttpClient>,
        method: GrpcMethod,
        engine_factory: Arc<EngineFactory>,
    ) -> Result<Self, ConfigError> {
        let cluster = clusters.http2_cluster(&config.collector_cluster)?;
        let endpoint: Uri = cluster.endpoint.parse().map_err(|_| {
            ConfigError::InvalidEndpoint {
                cluster: cluster.name.clone(),
                endpoint: cluster.endpoint.clone(),
            }
        })?;
        if endpoint.scheme().is_none() || endpoint.authority().is_none() {
            return Err(ConfigError::InvalidEndpoint {
                cluster: cluster.name.clone(),
                endpoint: cluster.endpoint.clone(),
            });
        }

        let config = Arc::new(config);
        let tracer_stats = Arc::new(TracerStats::default());
        let reporter_stats = Arc::new(ReporterStats::default());
        let method = Arc::new(method);

        let slot = {
            let config = config.clone();
            let reporter_stats = reporter_stats.clone();
            ThreadLocalSlot::new(move |_handle| {
                let transport = CollectorTransport::new(
                    client.clone(),
                    endpoint.clone(),
                    method.clone(),
                    overrides.clone(),
                    config.request_timeout_ms,
                );
                let tracer = engine_factory(EngineContext {
                    config: config.clone(),
                    transport,
                    reporter_stats: reporter_stats.clone(),
                });
                let flush_tracer = tracer.clone();
                let flush_timer = FlushTimer::spawn(
                    overrides.clone(),
                    config.flush_interval_ms,
                    reporter_stats.clone(),
                    move || flush_tracer.flush(),
                );
                Rc::new(ThreadTracer {
                    tracer,
                    _flush_timer: flush_timer,
                })
            })
        };

        Ok(ReportingDriver {
            config,
            tracer_stats,
            reporter_stats,
            slot,
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn reporter_stats(&self) -> &Arc<ReporterStats> {
        &self.reporter_stats
    }
}

impl std::fmt::Debug for ReportingDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportingDriver")
            .field("config", &self.config)
            .finish()
    }
}

impl Driver for ReportingDriver {
    fn tracer(&self) -> Rc<dyn Tracer> {
        self.slot.get().tracer.clone()
    }

    fn propagation_mode(&self) -> PropagationMode {
        self.config.propagation_mode
    }

    fn drop_logs(&self) -> bool {
        self.config.drop_logs
    }

    fn tracer_stats(&self) -> &Arc<TracerStats> {
        &self.tracer_stats
    }
}
