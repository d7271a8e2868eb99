//! dnsname-resolver - owner index for `DNSNameResolver` registrations.
//!
//! A `DNSNameResolver` object asks for the resolution results of a DNS name
//! (or a wildcard pattern such as `*.example.com.`) to be reported back to
//! it. This crate keeps an in-memory index of which objects, per namespace,
//! registered each name, fed by a watch of those objects. A DNS query chain
//! consults the index to decide whose status to update for a queried name.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                          dnsname-resolver                          │
//! │                                                                    │
//! │  ┌────────────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ RegistrationSource │──▶│ Synchronizer │──▶│   DnsNameIndex   │◀─┼── lookups
//! │  │  (watch stream)    │   │  (ns filter) │   │ regular|wildcard │  │
//! │  └────────────────────┘   └──────────────┘   └──────────────────┘  │
//! │            ▲                                                       │
//! │            │ start / shutdown                                      │
//! │  ┌────────────────────┐                                            │
//! │  │  DnsNameResolver   │                                            │
//! │  └────────────────────┘                                            │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership rules
//!
//! - A DNS name has at most one owning object per namespace. A second object
//!   registering the same name in the same namespace is ignored.
//! - Only the owning object can remove its registration, so delayed or
//!   duplicated deletes are harmless.
//! - A name disappears from the index once no namespace owns it.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use dnsname_resolver::{ChannelSource, DnsNameResolver, Notification, Registration, ResolverConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (source, tx) = ChannelSource::new();
//!     let resolver = DnsNameResolver::new(ResolverConfig::default(), &source).await.unwrap();
//!
//!     let registration = Registration::new("team-a", "resolver-1", "*.example.com.");
//!     tx.unbounded_send(Notification::added(&registration)).unwrap();
//!     tx.unbounded_send(Notification::Synced).unwrap();
//!
//!     resolver.start().await.unwrap();
//!     assert!(resolver.index().lookup("www.example.com.").is_some());
//!     resolver.shutdown().unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod index;
pub mod metrics;
pub mod resolver;
pub mod source;
pub mod sync;
pub mod telemetry;

// Re-export main types
pub use config::{Config, ResolverConfig, TelemetryConfig};
pub use error::ResolverError;
pub use event::{Notification, Registration, RegistrationEvent};
pub use filter::NamespaceFilter;
pub use index::{DnsNameIndex, NameMatch, Partition};
pub use resolver::{DnsNameResolver, Phase};
pub use source::{ChannelSource, RegistrationSource};
pub use sync::{ApplyOutcome, EventObserver, Synchronizer};
