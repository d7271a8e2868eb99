//! Shared test infrastructure for resolver integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc::UnboundedSender;
use tokio::sync::mpsc;

use dnsname_resolver::source::NotificationStream;
use dnsname_resolver::{
    ApplyOutcome, ChannelSource, DnsNameResolver, EventObserver, Notification, Registration,
    RegistrationEvent, RegistrationSource, ResolverConfig, ResolverError,
};

// --- Constants ---

pub const TEAM_A: &str = "team-a";
pub const TEAM_B: &str = "team-b";

// --- Observer ---

/// Forwards every observed event to a channel so tests can wait for the
/// background watch task to catch up.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<(RegistrationEvent, ApplyOutcome)>,
}

impl EventObserver for ChannelObserver {
    fn observe(&self, event: &RegistrationEvent, outcome: ApplyOutcome) {
        let _ = self.tx.send((event.clone(), outcome));
    }
}

pub fn channel_observer() -> (
    Arc<ChannelObserver>,
    mpsc::UnboundedReceiver<(RegistrationEvent, ApplyOutcome)>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelObserver { tx }), rx)
}

// --- Sources ---

/// Source whose watch can never be opened.
pub struct FailingSource;

#[async_trait]
impl RegistrationSource for FailingSource {
    async fn watch(&self, _resync: Duration) -> Result<NotificationStream, ResolverError> {
        Err(ResolverError::Source("cluster API unavailable".into()))
    }
}

// --- Builders ---

pub fn config_for(namespaces: &[&str]) -> ResolverConfig {
    ResolverConfig {
        namespaces: namespaces.iter().map(|ns| ns.to_string()).collect(),
        ..Default::default()
    }
}

pub fn reg(namespace: &str, object_name: &str, dns_name: &str) -> Registration {
    Registration::new(namespace, object_name, dns_name)
}

/// A resolver over a channel source, with an observer attached.
pub struct Harness {
    pub resolver: DnsNameResolver,
    pub tx: UnboundedSender<Notification>,
    pub events: mpsc::UnboundedReceiver<(RegistrationEvent, ApplyOutcome)>,
}

impl Harness {
    pub async fn new(namespaces: &[&str]) -> Self {
        let (source, tx) = ChannelSource::new();
        let (observer, events) = channel_observer();
        let resolver = DnsNameResolver::with_observer(config_for(namespaces), &source, observer)
            .await
            .expect("failed to create resolver");
        Self {
            resolver,
            tx,
            events,
        }
    }

    pub fn send(&self, notification: Notification) {
        self.tx
            .unbounded_send(notification)
            .expect("watch stream closed");
    }

    /// Start with an already-synced watch.
    pub async fn start_synced(&self) {
        self.send(Notification::Synced);
        self.resolver.start().await.expect("start failed");
    }

    /// Send a notification and wait until the observer reports it.
    pub async fn apply(&mut self, notification: Notification) -> ApplyOutcome {
        self.send(notification);
        self.next_outcome().await
    }

    pub async fn next_outcome(&mut self) -> ApplyOutcome {
        let (_, outcome) = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("observer channel closed");
        outcome
    }
}
