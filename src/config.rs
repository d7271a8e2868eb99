//! Configuration types for dnsname-resolver.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ResolverError;
use crate::filter::NamespaceFilter;

/// Period after which the watch source re-delivers every existing registration.
pub const RESYNC_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolver index configuration.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Resolver index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Namespaces whose registrations are tracked. Empty tracks every namespace.
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Lower bound in seconds for TTLs reported to registration owners.
    #[serde(default = "default_min_ttl")]
    pub min_ttl: u32,

    /// Consecutive lookup failures tolerated before an address is dropped.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            namespaces: Vec::new(),
            min_ttl: default_min_ttl(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

impl ResolverConfig {
    /// Check the values that cannot be expressed through serde defaults.
    pub fn validate(&self) -> Result<(), ResolverError> {
        if self.min_ttl == 0 {
            return Err(ResolverError::Config("min_ttl must be greater than 0".into()));
        }
        if self.failure_threshold == 0 {
            return Err(ResolverError::Config(
                "failure_threshold must be greater than 0".into(),
            ));
        }
        if let Some(ns) = self.namespaces.iter().find(|ns| ns.trim().is_empty()) {
            return Err(ResolverError::Config(format!(
                "invalid namespace {ns:?}: must not be empty"
            )));
        }
        Ok(())
    }

    /// Build the namespace filter for the configured allow-set.
    pub fn namespace_filter(&self) -> NamespaceFilter {
        NamespaceFilter::new(self.namespaces.iter().cloned().collect::<HashSet<_>>())
    }
}

fn default_min_ttl() -> u32 {
    5
}

fn default_failure_threshold() -> u32 {
    5
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "dnsname_resolver=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
