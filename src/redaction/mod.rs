//! Field redaction policy.
//!
//! # Responsibilities
//! - Decide which cookies are omitted from access events
//! - Decide which query parameter values are masked
//! - Allow the lists to be replaced at runtime
//!
//! # Design Decisions
//! - The policy is an immutable value; reconfiguration builds a new one
//! - The live policy sits behind an `ArcSwap` so readers never see a
//!   partially written list and never block on a writer

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

/// Replacement for anonymized query parameter values.
pub const MASK: &str = "*****";

/// Cookie blacklist and anonymized query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionPolicy {
    /// Cookie names that never appear in events.
    pub cookie_blacklist: Vec<String>,
    /// Query parameter names whose values are replaced with [`MASK`].
    pub anonymized_query_params: Vec<String>,
}

impl RedactionPolicy {
    pub fn new(cookie_blacklist: Vec<String>, anonymized_query_params: Vec<String>) -> Self {
        Self {
            cookie_blacklist,
            anonymized_query_params,
        }
    }

    pub fn is_cookie_blacklisted(&self, name: &str) -> bool {
        self.cookie_blacklist.iter().any(|c| c == name)
    }

    pub fn is_query_param_anonymized(&self, name: &str) -> bool {
        self.anonymized_query_params.iter().any(|p| p == name)
    }
}

/// Shared, atomically replaceable handle to the live policy.
#[derive(Debug, Clone, Default)]
pub struct RedactionHandle {
    inner: Arc<ArcSwap<RedactionPolicy>>,
}

impl RedactionHandle {
    pub fn new(policy: RedactionPolicy) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(policy)),
        }
    }

    /// Snapshot of the policy in force right now.
    pub fn current(&self) -> Arc<RedactionPolicy> {
        self.inner.load_full()
    }

    /// Replace the whole policy.
    pub fn replace(&self, policy: RedactionPolicy) {
        self.inner.store(Arc::new(policy));
    }

    /// Replace the cookie blacklist, keeping the query parameter list.
    pub fn set_cookie_blacklist(&self, names: Vec<String>) {
        self.inner.rcu(|current| RedactionPolicy {
            cookie_blacklist: names.clone(),
            anonymized_query_params: current.anonymized_query_params.clone(),
        });
    }

    /// Replace the anonymized query parameters, keeping the cookie blacklist.
    pub fn set_anonymized_query_params(&self, names: Vec<String>) {
        self.inner.rcu(|current| RedactionPolicy {
            cookie_blacklist: current.cookie_blacklist.clone(),
            anonymized_query_params: names.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_membership() {
        let policy = RedactionPolicy::new(names(&["ignore", "user_id"]), names(&["q", "q"]));

        assert!(policy.is_cookie_blacklisted("ignore"));
        assert!(policy.is_cookie_blacklisted("user_id"));
        assert!(!policy.is_cookie_blacklisted("foo"));
        assert!(!policy.is_cookie_blacklisted("IGNORE"));

        assert!(policy.is_query_param_anonymized("q"));
        assert!(!policy.is_query_param_anonymized("page"));
    }

    #[test]
    fn test_empty_policy_redacts_nothing() {
        let policy = RedactionPolicy::default();
        assert!(!policy.is_cookie_blacklisted("session"));
        assert!(!policy.is_query_param_anonymized("token"));
    }

    #[test]
    fn test_handle_replaces_wholesale() {
        let handle = RedactionHandle::new(RedactionPolicy::new(names(&["a"]), names(&["x"])));

        handle.set_cookie_blacklist(names(&["b", "c"]));
        let policy = handle.current();
        assert_eq!(policy.cookie_blacklist, names(&["b", "c"]));
        assert_eq!(policy.anonymized_query_params, names(&["x"]));

        handle.set_anonymized_query_params(Vec::new());
        assert!(handle.current().anonymized_query_params.is_empty());
        assert_eq!(handle.current().cookie_blacklist, names(&["b", "c"]));
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let handle = RedactionHandle::new(RedactionPolicy::new(names(&["a"]), Vec::new()));
        let before = handle.current();

        handle.replace(RedactionPolicy::default());

        assert!(before.is_cookie_blacklisted("a"));
        assert!(!handle.current().is_cookie_blacklisted("a"));
    }

    #[test]
    fn test_concurrent_readers_see_whole_lists() {
        let handle = RedactionHandle::new(RedactionPolicy::new(names(&["a", "b"]), Vec::new()));
        let writer = handle.clone();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let h = handle.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        let len = h.current().cookie_blacklist.len();
                        assert!(len == 2 || len == 3);
                    }
                })
            })
            .collect();

        for i in 0..100 {
            if i % 2 == 0 {
                writer.set_cookie_blacklist(names(&["a", "b", "c"]));
            } else {
                writer.set_cookie_blacklist(names(&["a", "b"]));
            }
        }

        for r in readers {
            r.join().unwrap();
        }
    }
}
