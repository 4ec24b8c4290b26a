//! Driver configuration.
//!
//! A [`DriverConfig`] is captured once at construction and shared read-only
//! across all worker threads; nothing here is mutated afterwards. Knobs that
//! operators may want to tune without a restart (`flush_interval_ms`,
//! `request_timeout_ms`) are additionally read through [`RuntimeOverrides`]
//! each time they are applied.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::error::ConfigError;

pub(crate) fn default_flush_interval_ms() -> u64 {
    1000
}

pub(crate) fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_drop_logs() -> bool {
    true
}

/// How span context is written to outbound request headers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropagationMode {
    /// Serialize the context with the tracer's writer, base64-encode it and
    /// set it as the single inline header, overwriting any prior value.
    #[default]
    SingleHeader,
    /// Single-header injection plus the tracer-native writer, which may
    /// append zero or more vendor-specific headers.
    Dual,
}

/// Tracing driver configuration, immutable after construction.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Name of the upstream cluster the collector is reached through.
    pub collector_cluster: String,
    /// Access token forwarded to the tracer engine, if the vendor wants one.
    #[serde(default)]
    pub access_token: String,
    /// Component name reported alongside spans.
    #[serde(default)]
    pub component_name: String,
    /// Cadence of the per-thread buffered-span flush timer.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Upper bound on a single collector call.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Suppress span log events globally for bandwidth and memory control.
    #[serde(default = "default_drop_logs")]
    pub drop_logs: bool,
    #[serde(default)]
    pub propagation_mode: PropagationMode,
}

impl DriverConfig {
    /// Parse a configuration document, rejecting unknown fields.
    pub fn from_json(document: &serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(document.clone())?)
    }
}

/// What the host knows about one upstream cluster.
#[derive(Clone, Debug)]
pub struct ClusterInfo {
    pub name: String,
    /// Base URI of the cluster, e.g. `http://collector:8360`.
    pub endpoint: String,
    /// Whether the cluster speaks HTTP/2. gRPC collector calls require it.
    pub http2: bool,
}

/// Read-only registry of upstream clusters, captured from the host at driver
/// construction.
#[derive(Clone, Debug, Default)]
pub struct ClusterSet {
    clusters: HashMap<String, ClusterInfo>,
}

impl ClusterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cluster: ClusterInfo) {
        self.clusters.insert(cluster.name.clone(), cluster);
    }

    pub fn get(&self, name: &str) -> Option<&ClusterInfo> {
        self.clusters.get(name)
    }

    /// Resolve a cluster that must carry gRPC collector calls.
    pub fn http2_cluster(&self, name: &str) -> Result<&ClusterInfo, ConfigError> {
        let cluster = self
            .clusters
            .get(name)
            .ok_or_else(|| ConfigError::UnknownCluster(name.to_string()))?;
        if !cluster.http2 {
            return Err(ConfigError::ClusterNotHttp2(cluster.name.clone()));
        }
        Ok(cluster)
    }
}

/// Source of runtime-overridable integer settings.
///
/// Defaults come from [`DriverConfig`]; an override layer lets operators
/// adjust flush cadence and request timeouts on a live process. The default
/// implementation returns the fallback unchanged.
pub trait RuntimeOverrides: Send + Sync + fmt::Debug {
    fn get_u64(&self, key: &str, fallback: u64) -> u64 {
        let _ = key;
        fallback
    }
}

/// Override source that never overrides anything.
#[derive(Debug, Default)]
pub struct NoOverrides;

impl RuntimeOverrides for NoOverrides {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_config_uses_defaults() {
        let config =
            DriverConfig::from_json(&json!({"collector_cluster": "lightstep_saas"})).unwrap();
        assert_eq!(config.collector_cluster, "lightstep_saas");
        assert_eq!(config.flush_interval_ms, 1000);
        assert_eq!(config.request_timeout_ms, 5000);
        assert!(config.drop_logs);
        assert_eq!(config.propagation_mode, PropagationMode::SingleHeader);
    }

    #[test]
    fn full_config_round_trips() {
        let config = DriverConfig::from_json(&json!({
            "collector_cluster": "collector",
            "access_token": "token",
            "component_name": "ingress",
            "flush_interval_ms": 250,
            "request_timeout_ms": 100,
            "drop_logs": false,
            "propagation_mode": "dual",
        }))
        .unwrap();
        assert_eq!(config.propagation_mode, PropagationMode::Dual);
        assert_eq!(config.flush_interval_ms, 250);
        assert!(!config.drop_logs);
    }

    #[test]
    fn missing_cluster_is_rejected() {
        let err = DriverConfig::from_json(&json!({"access_token": "token"})).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDocument(_)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = DriverConfig::from_json(&json!({
            "collector_cluster": "collector",
            "collector_port": 8360,
        }))
        .unwrap_err();
        assert!(err.to_string().contains("collector_port"));
    }

    #[test]
    fn http2_cluster_resolution() {
        let mut clusters = ClusterSet::new();
        clusters.insert(ClusterInfo {
            name: "h2".to_string(),
            endpoint: "http://collector:8360".to_string(),
            http2: true,
        });
        clusters.insert(ClusterInfo {
            name: "h1".to_string(),
            endpoint: "http://collector:8361".to_string(),
            http2: false,
        });

        assert!(clusters.http2_cluster("h2").is_ok());
        assert!(matches!(
            clusters.http2_cluster("h1"),
            Err(ConfigError::ClusterNotHttp2(_))
        ));
        assert!(matches!(
            clusters.http2_cluster("absent"),
            Err(ConfigError::UnknownCluster(_))
        ));
    }

    #[derive(Debug)]
    struct FixedOverrides(u64);

    impl RuntimeOverrides for FixedOverrides {
        fn get_u64(&self, _key: &str, _fallback: u64) -> u64 {
            self.0
        }
    }

    #[test]
    fn overrides_shadow_config_values() {
        let config =
            DriverConfig::from_json(&json!({"collector_cluster": "collector"})).unwrap();
        let overrides = FixedOverrides(42);
        assert_eq!(
            overrides.get_u64("tracing.collector.flush_interval_ms", config.flush_interval_ms),
            42
        );
        assert_eq!(
            NoOverrides.get_u64("tracing.collector.flush_interval_ms", config.flush_interval_ms),
            1000
        );
    }
}
