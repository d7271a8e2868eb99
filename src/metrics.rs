//! Metrics instrumentation for dnsname-resolver.
//!
//! All metrics are prefixed with `dnsname_resolver.`

use metrics::{counter, gauge, histogram};
use std::time::Duration;

use crate::sync::ApplyOutcome;

/// Record a processed notification.
pub fn record_event(kind: &'static str, outcome: ApplyOutcome) {
    counter!("dnsname_resolver.event.count", "kind" => kind, "outcome" => outcome.as_str())
        .increment(1);
}

/// Record index sizes (call periodically or on change).
pub fn record_index_counts(regular: usize, wildcard: usize) {
    gauge!("dnsname_resolver.index.regular.count").set(regular as f64);
    gauge!("dnsname_resolver.index.wildcard.count").set(wildcard as f64);
}

/// Outcome of the startup wait.
#[derive(Debug, Clone, Copy)]
pub enum SyncWaitResult {
    /// The source reported its initial listing complete.
    Synced,
    /// The deadline passed first; serving with a partial index.
    TimedOut,
}

/// Record how the startup wait ended and how long it took.
pub fn record_sync_wait(result: SyncWaitResult, duration: Duration) {
    let result_str = match result {
        SyncWaitResult::Synced => "synced",
        SyncWaitResult::TimedOut => "timeout",
    };

    counter!("dnsname_resolver.sync_wait.count", "result" => result_str).increment(1);
    histogram!("dnsname_resolver.sync_wait.duration.seconds").record(duration.as_secs_f64());
}

/// Record the synced state of the watch source.
pub fn record_synced(synced: bool) {
    gauge!("dnsname_resolver.source.synced").set(if synced { 1.0 } else { 0.0 });
}

/// Record a shutdown request, accepted or rejected as a repeat.
pub fn record_shutdown(accepted: bool) {
    let result = if accepted { "accepted" } else { "repeated" };
    counter!("dnsname_resolver.shutdown.count", "result" => result).increment(1);
}
