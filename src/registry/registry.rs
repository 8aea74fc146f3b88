//! Subscription registry.
//!
//! Maps a **target domain** (the source of truth being watched) to the set
//! of **subscriber domains** mirroring it. Two invariants hold across every
//! operation sequence:
//!
//! - an entry exists for a target iff its subscriber set is non-empty
//!   (empty sets are pruned on the last unregister, never stored);
//! - within one target's set each subscriber domain appears at most once,
//!   insertion order preserved.
//!
//! Domains are stored verbatim and compared case-sensitively; callers
//! normalize (see [`crate::tabs::url_domain`]) before registering.
//!
//! The registry itself is plain data with no locking. The engine owns the
//! single authoritative copy and serializes access through its command
//! loop; the serde shape below is also the on-disk JSON shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Store key the registry persists under.
pub const REGISTRY_STORE_KEY: &str = "subscriptions";

/// One subscriber record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub domain: String,
}

/// Subscribers of one target domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriberSet {
    pub subscribers: Vec<Subscriber>,
}

/// The registry mapping. Serializes as
/// `{ [target]: { "subscribers": [{ "domain": s }] } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionRegistry {
    entries: HashMap<String, SubscriberSet>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subscriber_domain` under `target_domain`, creating the entry
    /// lazily. Idempotent. Returns `true` when the registry changed.
    pub fn register(&mut self, subscriber_domain: &str, target_domain: &str) -> bool {
        let set = self.entries.entry(target_domain.to_string()).or_default();
        let exists = set
            .subscribers
            .iter()
            .any(|s| s.domain == subscriber_domain);
        if exists {
            return false;
        }
        set.subscribers.push(Subscriber {
            domain: subscriber_domain.to_string(),
        });
        true
    }

    /// Removes `subscriber_domain` from `target_domain`'s set, pruning the
    /// entry when it empties. No-op (returns `false`) when either is
    /// absent.
    pub fn unregister(&mut self, subscriber_domain: &str, target_domain: &str) -> bool {
        let Some(set) = self.entries.get_mut(target_domain) else {
            return false;
        };
        let before = set.subscribers.len();
        set.subscribers.retain(|s| s.domain != subscriber_domain);
        if set.subscribers.len() == before {
            return false;
        }
        if set.subscribers.is_empty() {
            self.entries.remove(target_domain);
        }
        true
    }

    /// Subscribers watching `target_domain`; empty when none.
    pub fn subscribers_of(&self, target_domain: &str) -> &[Subscriber] {
        self.entries
            .get(target_domain)
            .map(|s| s.subscribers.as_slice())
            .unwrap_or(&[])
    }

    /// Target domains with at least one subscriber.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuilds a registry from a persisted store value.
    ///
    /// Malformed data degrades to an empty registry (the process must keep
    /// running and rebuild state incrementally); well-formed data is
    /// re-sanitized so the in-memory invariants hold even if the store was
    /// written by an older or buggy writer.
    pub fn from_store_value(value: Option<serde_json::Value>) -> Self {
        let Some(value) = value else {
            return Self::new();
        };
        match serde_json::from_value::<SubscriptionRegistry>(value) {
            Ok(registry) => registry.sanitized(),
            Err(err) => {
                log::warn!("discarding malformed subscription registry: {err}");
                Self::new()
            }
        }
    }

    /// The plain-data form written to the store.
    ///
    /// # Errors
    /// Serialization of this shape cannot realistically fail; the error is
    /// still surfaced so the flush path can log it.
    pub fn to_store_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Drops empty sets and duplicate subscriber domains (first kept).
    fn sanitized(mut self) -> Self {
        self.entries.retain(|_, set| {
            let mut seen = Vec::with_capacity(set.subscribers.len());
            set.subscribers.retain(|s| {
                if seen.contains(&s.domain) {
                    false
                } else {
                    seen.push(s.domain.clone());
                    true
                }
            });
            !set.subscribers.is_empty()
        });
        self
    }
}
