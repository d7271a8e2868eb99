//! In-memory DNS name index derived from `DNSNameResolver` registrations.
//!
//! Names are kept in two partitions:
//! - regular names, matched exactly (`www.example.com.`)
//! - wildcard names starting with `*.`, matched at label boundaries
//!   (`*.example.com.` matches `www.example.com.` and `a.b.example.com.`)
//!
//! Each partition is guarded by its own lock and no operation ever holds both.

use hickory_proto::rr::Name;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::metrics;

/// Owners of one DNS name: namespace -> object name.
pub type NamespaceOwners = HashMap<String, String>;

/// Which index a DNS name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Exact-match names.
    Regular,
    /// Names whose first label is `*`.
    Wildcard,
}

impl Partition {
    /// Classify a DNS name by its text. Only a literal `*.` prefix is a wildcard.
    pub fn of(dns_name: &str) -> Self {
        if dns_name.starts_with("*.") {
            Partition::Wildcard
        } else {
            Partition::Regular
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Regular => "regular",
            Partition::Wildcard => "wildcard",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`DnsNameIndex::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// The namespace now owns the name.
    Inserted,
    /// The same object already owned the name in this namespace.
    Unchanged,
    /// Another object owns the name in this namespace; nothing changed.
    Conflict {
        /// The object that keeps ownership.
        owner: String,
    },
}

impl Upsert {
    /// Whether the index was modified.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Upsert::Inserted)
    }
}

/// Result of [`DnsNameIndex::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The owner was removed.
    Removed,
    /// The namespace is owned by a different object (or by none).
    NotOwner,
    /// The DNS name is not indexed.
    Absent,
}

impl Removal {
    /// Whether the index was modified.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Removal::Removed)
    }
}

/// A DNS name entry matched by a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatch {
    /// The indexed name that matched (the pattern itself for wildcards).
    pub dns_name: String,
    /// Partition the entry lives in.
    pub partition: Partition,
    /// Current owners of the entry.
    pub owners: NamespaceOwners,
}

/// Ordered copy of both partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexSnapshot {
    /// Regular names.
    pub regular: BTreeMap<String, BTreeMap<String, String>>,
    /// Wildcard names.
    pub wildcard: BTreeMap<String, BTreeMap<String, String>>,
}

type NameMap = HashMap<String, NamespaceOwners>;

/// Thread-safe dual-partition index: DNS name -> namespace -> object name.
#[derive(Debug, Clone, Default)]
pub struct DnsNameIndex {
    inner: Arc<DnsNameIndexInner>,
}

#[derive(Debug, Default)]
struct DnsNameIndexInner {
    regular: Mutex<NameMap>,
    wildcard: Mutex<NameMap>,
}

impl DnsNameIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, partition: Partition) -> &Mutex<NameMap> {
        match partition {
            Partition::Regular => &self.inner.regular,
            Partition::Wildcard => &self.inner.wildcard,
        }
    }

    /// Register `object_name` as the owner of `dns_name` in `namespace`.
    ///
    /// An existing owner with a different object name is never replaced.
    pub fn upsert(
        &self,
        partition: Partition,
        dns_name: &str,
        namespace: &str,
        object_name: &str,
    ) -> Upsert {
        let mut names = self.partition(partition).lock();
        let owners = names.entry(dns_name.to_string()).or_default();

        match owners.get(namespace) {
            Some(owner) if owner == object_name => Upsert::Unchanged,
            Some(owner) => {
                let owner = owner.clone();
                debug!(
                    %partition,
                    dns_name,
                    namespace,
                    object_name,
                    %owner,
                    "ignoring conflicting registration"
                );
                Upsert::Conflict { owner }
            }
            None => {
                owners.insert(namespace.to_string(), object_name.to_string());
                debug!(%partition, dns_name, namespace, object_name, "registered owner");
                Upsert::Inserted
            }
        }
    }

    /// Remove `object_name` as the owner of `dns_name` in `namespace`.
    ///
    /// Only the current owner can be removed. The name is dropped once no
    /// namespace owns it.
    pub fn remove(
        &self,
        partition: Partition,
        dns_name: &str,
        namespace: &str,
        object_name: &str,
    ) -> Removal {
        let mut names = self.partition(partition).lock();
        let Some(owners) = names.get_mut(dns_name) else {
            return Removal::Absent;
        };

        if owners.get(namespace).map(String::as_str) != Some(object_name) {
            debug!(%partition, dns_name, namespace, object_name, "ignoring removal by non-owner");
            return Removal::NotOwner;
        }

        owners.remove(namespace);
        if owners.is_empty() {
            names.remove(dns_name);
        }
        debug!(%partition, dns_name, namespace, object_name, "removed owner");
        Removal::Removed
    }

    /// Owners of an indexed name, looked up by its exact text.
    pub fn owners(&self, partition: Partition, dns_name: &str) -> Option<NamespaceOwners> {
        self.partition(partition).lock().get(dns_name).cloned()
    }

    /// Best match for a queried name: the exact regular entry, otherwise the
    /// most specific wildcard entry.
    pub fn lookup(&self, name: &str) -> Option<NameMatch> {
        self.lookup_regular(name)
            .or_else(|| self.lookup_wildcards(name).into_iter().next())
    }

    /// Every entry matching a queried name, the regular entry first and then
    /// wildcard entries from most to least specific.
    pub fn matches(&self, name: &str) -> Vec<NameMatch> {
        let mut matches: Vec<NameMatch> = self.lookup_regular(name).into_iter().collect();
        matches.extend(self.lookup_wildcards(name));
        matches
    }

    /// [`lookup`](Self::lookup) for a parsed name, compared in lower-case FQDN form.
    pub fn lookup_name(&self, name: &Name) -> Option<NameMatch> {
        let mut name = name.to_lowercase();
        name.set_fqdn(true);
        self.lookup(&name.to_string())
    }

    fn lookup_regular(&self, name: &str) -> Option<NameMatch> {
        let names = self.inner.regular.lock();
        names.get(name).map(|owners| NameMatch {
            dns_name: name.to_string(),
            partition: Partition::Regular,
            owners: owners.clone(),
        })
    }

    fn lookup_wildcards(&self, name: &str) -> Vec<NameMatch> {
        let names = self.inner.wildcard.lock();
        if names.is_empty() {
            return Vec::new();
        }

        wildcard_candidates(name)
            .filter_map(|pattern| {
                names.get(&pattern).map(|owners| NameMatch {
                    dns_name: pattern,
                    partition: Partition::Wildcard,
                    owners: owners.clone(),
                })
            })
            .collect()
    }

    /// Number of regular names.
    pub fn regular_count(&self) -> usize {
        self.inner.regular.lock().len()
    }

    /// Number of wildcard names.
    pub fn wildcard_count(&self) -> usize {
        self.inner.wildcard.lock().len()
    }

    /// Whether both partitions are empty.
    pub fn is_empty(&self) -> bool {
        self.regular_count() == 0 && self.wildcard_count() == 0
    }

    /// Ordered copy of both partitions. Each partition is copied under its
    /// own lock, so the two halves may reflect different instants.
    pub fn snapshot(&self) -> IndexSnapshot {
        IndexSnapshot {
            regular: Self::copy_sorted(&self.inner.regular),
            wildcard: Self::copy_sorted(&self.inner.wildcard),
        }
    }

    fn copy_sorted(names: &Mutex<NameMap>) -> BTreeMap<String, BTreeMap<String, String>> {
        names
            .lock()
            .iter()
            .map(|(name, owners)| {
                let owners = owners
                    .iter()
                    .map(|(ns, obj)| (ns.clone(), obj.clone()))
                    .collect();
                (name.clone(), owners)
            })
            .collect()
    }

    /// Emit current index metrics.
    pub fn emit_metrics(&self) {
        metrics::record_index_counts(self.regular_count(), self.wildcard_count());
    }
}

/// Wildcard patterns that could match `name`: strip the leftmost label and
/// prefix `*.`, repeating until no parent domain is left.
///
/// `a.b.example.com.` yields `*.b.example.com.`, `*.example.com.`, `*.com.`.
fn wildcard_candidates(name: &str) -> impl Iterator<Item = String> + '_ {
    let mut rest = name;
    std::iter::from_fn(move || {
        let (_, parent) = rest.split_once('.')?;
        if parent.is_empty() || parent == "." {
            return None;
        }
        rest = parent;
        Some(format!("*.{parent}"))
    })
}
