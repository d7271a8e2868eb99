//! Notifications delivered by the watch source and their validated form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::index::Partition;

/// Raw notification as delivered by the watch source.
///
/// Objects are kept as untyped JSON until validated by
/// [`Notification::into_event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Notification {
    /// An object was created (or re-listed on resync).
    Added {
        /// The object.
        object: Value,
    },
    /// An object changed.
    Updated {
        /// The object before the change.
        old: Value,
        /// The object after the change.
        new: Value,
    },
    /// An object was deleted.
    Deleted {
        /// The last known state of the object.
        object: Value,
    },
    /// The initial listing has been delivered.
    Synced,
}

impl Notification {
    /// Validate the payload. Returns `None` for [`Notification::Synced`].
    pub fn into_event(self) -> Option<RegistrationEvent> {
        let event = match self {
            Notification::Added { object } => match Registration::from_object(&object) {
                Ok(registration) => RegistrationEvent::Added(registration),
                Err(reason) => RegistrationEvent::malformed(EventKind::Added, reason, object),
            },
            Notification::Updated { old, new } => {
                let parsed = Registration::from_object(&old)
                    .map_err(|reason| (reason, old))
                    .and_then(|old| {
                        Registration::from_object(&new)
                            .map(|new| (old, new))
                            .map_err(|reason| (reason, new))
                    });
                match parsed {
                    Ok((old, new)) if old.namespace != new.namespace
                        || old.object_name != new.object_name =>
                    {
                        let reason = format!(
                            "object identity changed from {}/{} to {}/{}",
                            old.namespace, old.object_name, new.namespace, new.object_name
                        );
                        RegistrationEvent::malformed(EventKind::Updated, reason, new.to_object())
                    }
                    Ok((old, new)) => RegistrationEvent::Updated { old, new },
                    Err((reason, object)) => {
                        RegistrationEvent::malformed(EventKind::Updated, reason, object)
                    }
                }
            }
            Notification::Deleted { object } => match Registration::from_object(&object) {
                Ok(registration) => RegistrationEvent::Deleted(registration),
                Err(reason) => RegistrationEvent::malformed(EventKind::Deleted, reason, object),
            },
            Notification::Synced => return None,
        };
        Some(event)
    }

    /// Build an `ADDED` notification for a registration.
    pub fn added(registration: &Registration) -> Self {
        Notification::Added {
            object: registration.to_object(),
        }
    }

    /// Build an `UPDATED` notification.
    pub fn updated(old: &Registration, new: &Registration) -> Self {
        Notification::Updated {
            old: old.to_object(),
            new: new.to_object(),
        }
    }

    /// Build a `DELETED` notification for a registration.
    pub fn deleted(registration: &Registration) -> Self {
        Notification::Deleted {
            object: registration.to_object(),
        }
    }
}

/// Kind of change carried by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Object created.
    Added,
    /// Object changed.
    Updated,
    /// Object deleted.
    Deleted,
}

impl EventKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Added => "added",
            EventKind::Updated => "updated",
            EventKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `DNSNameResolver` object reduced to the fields the index needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Registration {
    /// Namespace of the object.
    pub namespace: String,
    /// Name of the object.
    pub object_name: String,
    /// DNS name (or wildcard pattern) the object tracks.
    pub dns_name: String,
}

impl Registration {
    /// Create a registration.
    pub fn new(
        namespace: impl Into<String>,
        object_name: impl Into<String>,
        dns_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            object_name: object_name.into(),
            dns_name: dns_name.into(),
        }
    }

    /// Partition the DNS name is stored in.
    pub fn partition(&self) -> Partition {
        Partition::of(&self.dns_name)
    }

    /// Extract a registration from a `DNSNameResolver` JSON object.
    pub fn from_object(object: &Value) -> Result<Self, String> {
        let object = DnsNameResolverObject::deserialize(object).map_err(|e| e.to_string())?;

        let fields = [
            ("metadata.namespace", &object.metadata.namespace),
            ("metadata.name", &object.metadata.name),
            ("spec.name", &object.spec.name),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.is_empty()) {
            return Err(format!("{field} is empty"));
        }

        Ok(Self {
            namespace: object.metadata.namespace,
            object_name: object.metadata.name,
            dns_name: object.spec.name,
        })
    }

    /// Render as a minimal `DNSNameResolver` JSON object.
    pub fn to_object(&self) -> Value {
        serde_json::json!({
            "metadata": {
                "name": self.object_name,
                "namespace": self.namespace,
            },
            "spec": {
                "name": self.dns_name,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct DnsNameResolverObject {
    metadata: ObjectMeta,
    spec: DnsNameResolverSpec,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
    namespace: String,
}

#[derive(Debug, Deserialize)]
struct DnsNameResolverSpec {
    name: String,
}

/// A validated notification.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationEvent {
    /// Registration created.
    Added(Registration),
    /// Registration changed.
    Updated {
        /// Before the change.
        old: Registration,
        /// After the change.
        new: Registration,
    },
    /// Registration deleted.
    Deleted(Registration),
    /// The payload was not a `DNSNameResolver` object.
    Malformed {
        /// Kind of the notification that carried it.
        kind: EventKind,
        /// Why validation failed.
        reason: String,
        /// The offending payload.
        object: Value,
    },
}

impl RegistrationEvent {
    fn malformed(kind: EventKind, reason: String, object: Value) -> Self {
        RegistrationEvent::Malformed {
            kind,
            reason,
            object,
        }
    }

    /// Kind of change this event carries.
    pub fn kind(&self) -> EventKind {
        match self {
            RegistrationEvent::Added(_) => EventKind::Added,
            RegistrationEvent::Updated { .. } => EventKind::Updated,
            RegistrationEvent::Deleted(_) => EventKind::Deleted,
            RegistrationEvent::Malformed { kind, .. } => *kind,
        }
    }
}
