//! Logging and metrics export for the dnsname-resolver binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;
use crate::error::ResolverError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Install the stderr log subscriber and, with the `prometheus` feature,
/// the metrics exporter.
pub fn init(config: &TelemetryConfig) -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(log_filter(&config.log_level)?)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    #[cfg(feature = "prometheus")]
    if let Some(addr) = config.prometheus_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        tracing::info!(%addr, "serving resolver metrics");
    }

    Ok(())
}

/// `RUST_LOG` when set, otherwise the configured level.
fn log_filter(level: &str) -> Result<EnvFilter, ResolverError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| ResolverError::Config(format!("invalid log_level {level:?}: {e}")))
}
