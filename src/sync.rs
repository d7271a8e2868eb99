//! Applies registration events to the DNS name index.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::event::{Notification, Registration, RegistrationEvent};
use crate::filter::NamespaceFilter;
use crate::index::{DnsNameIndex, Removal, Upsert};
use crate::metrics;

/// What applying one event did to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The index changed.
    Applied,
    /// The event was already reflected in the index.
    Unchanged,
    /// A different object owns the name in this namespace.
    Conflict,
    /// A removal from an object that does not own the name.
    Stale,
    /// The namespace is not tracked.
    Filtered,
    /// The payload failed validation.
    Malformed,
}

impl ApplyOutcome {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Applied => "applied",
            ApplyOutcome::Unchanged => "unchanged",
            ApplyOutcome::Conflict => "conflict",
            ApplyOutcome::Stale => "stale",
            ApplyOutcome::Filtered => "filtered",
            ApplyOutcome::Malformed => "malformed",
        }
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook invoked after every well-formed, in-scope event has been applied.
pub trait EventObserver: Send + Sync {
    /// Called with the event and what it did to the index.
    fn observe(&self, event: &RegistrationEvent, outcome: ApplyOutcome);
}

/// Observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EventObserver for NoopObserver {
    fn observe(&self, _event: &RegistrationEvent, _outcome: ApplyOutcome) {}
}

/// Turns registration events into index mutations.
#[derive(Clone)]
pub struct Synchronizer {
    index: DnsNameIndex,
    filter: Arc<NamespaceFilter>,
    observer: Arc<dyn EventObserver>,
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("index", &self.index)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl Synchronizer {
    /// Create a synchronizer with no observer.
    pub fn new(index: DnsNameIndex, filter: NamespaceFilter) -> Self {
        Self::with_observer(index, filter, Arc::new(NoopObserver))
    }

    /// Create a synchronizer that reports every applied event to `observer`.
    pub fn with_observer(
        index: DnsNameIndex,
        filter: NamespaceFilter,
        observer: Arc<dyn EventObserver>,
    ) -> Self {
        Self {
            index,
            filter: Arc::new(filter),
            observer,
        }
    }

    /// The index this synchronizer writes to.
    pub fn index(&self) -> &DnsNameIndex {
        &self.index
    }

    /// Validate and apply a raw notification. Returns `None` for the sync marker.
    pub fn handle(&self, notification: Notification) -> Option<ApplyOutcome> {
        notification.into_event().map(|event| self.apply(&event))
    }

    /// Apply one event to the index.
    pub fn apply(&self, event: &RegistrationEvent) -> ApplyOutcome {
        let outcome = match event {
            RegistrationEvent::Malformed {
                kind,
                reason,
                object,
            } => {
                warn!(%kind, %reason, %object, "object not of type DNSNameResolver");
                metrics::record_event(kind.as_str(), ApplyOutcome::Malformed);
                return ApplyOutcome::Malformed;
            }
            RegistrationEvent::Added(registration) => {
                if !self.filter.in_scope(&registration.namespace) {
                    return self.filtered(event);
                }
                self.add(registration)
            }
            RegistrationEvent::Deleted(registration) => {
                if !self.filter.in_scope(&registration.namespace) {
                    return self.filtered(event);
                }
                self.delete(registration)
            }
            RegistrationEvent::Updated { old, new } => {
                if !self.filter.in_scope(&old.namespace) || !self.filter.in_scope(&new.namespace) {
                    return self.filtered(event);
                }
                self.update(old, new)
            }
        };

        metrics::record_event(event.kind().as_str(), outcome);
        self.observer.observe(event, outcome);
        outcome
    }

    fn filtered(&self, event: &RegistrationEvent) -> ApplyOutcome {
        debug!(kind = %event.kind(), "ignoring event from unconfigured namespace");
        metrics::record_event(event.kind().as_str(), ApplyOutcome::Filtered);
        ApplyOutcome::Filtered
    }

    fn add(&self, registration: &Registration) -> ApplyOutcome {
        let result = self.index.upsert(
            registration.partition(),
            &registration.dns_name,
            &registration.namespace,
            &registration.object_name,
        );

        match result {
            Upsert::Inserted => ApplyOutcome::Applied,
            Upsert::Unchanged => ApplyOutcome::Unchanged,
            Upsert::Conflict { owner } => {
                warn!(
                    dns_name = %registration.dns_name,
                    namespace = %registration.namespace,
                    object_name = %registration.object_name,
                    %owner,
                    "DNS name already registered by another object in this namespace"
                );
                ApplyOutcome::Conflict
            }
        }
    }

    fn delete(&self, registration: &Registration) -> ApplyOutcome {
        let result = self.index.remove(
            registration.partition(),
            &registration.dns_name,
            &registration.namespace,
            &registration.object_name,
        );

        match result {
            Removal::Removed => ApplyOutcome::Applied,
            Removal::NotOwner | Removal::Absent => ApplyOutcome::Stale,
        }
    }

    /// An update only touches the index when the tracked DNS name changed:
    /// the old registration is removed if still owned, then the new one is
    /// added. Each step takes its own partition lock.
    fn update(&self, old: &Registration, new: &Registration) -> ApplyOutcome {
        if old == new {
            return ApplyOutcome::Unchanged;
        }

        debug!(
            old_dns_name = %old.dns_name,
            new_dns_name = %new.dns_name,
            namespace = %new.namespace,
            object_name = %new.object_name,
            "registration changed, re-indexing"
        );

        let removed = self.delete(old) == ApplyOutcome::Applied;

        match self.add(new) {
            ApplyOutcome::Unchanged if removed => ApplyOutcome::Applied,
            ApplyOutcome::Conflict if removed => ApplyOutcome::Applied,
            outcome => outcome,
        }
    }
}
