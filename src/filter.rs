//! Namespace allow-list.

use std::collections::HashSet;

/// Decides whether registrations from a namespace are tracked.
///
/// An empty allow-set tracks every namespace.
#[derive(Debug, Clone, Default)]
pub struct NamespaceFilter {
    allowed: HashSet<String>,
}

impl NamespaceFilter {
    /// Create a filter over the given allow-set.
    pub fn new(allowed: HashSet<String>) -> Self {
        Self { allowed }
    }

    /// Filter that accepts every namespace.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Check whether `namespace` is in scope.
    pub fn in_scope(&self, namespace: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(namespace)
    }
}

impl<S: Into<String>> FromIterator<S> for NamespaceFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_allow_set_matches_all() {
        let filter = NamespaceFilter::allow_all();
        assert!(filter.in_scope("team-a"));
        assert!(filter.in_scope(""));
    }

    #[test]
    fn test_configured_namespaces_only() {
        let filter: NamespaceFilter = ["team-a", "team-b"].into_iter().collect();
        assert!(filter.in_scope("team-a"));
        assert!(filter.in_scope("team-b"));
        assert!(!filter.in_scope("team-c"));
        assert!(!filter.in_scope("team"));
    }
}
