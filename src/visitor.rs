//! Visitor identifier: generated once per profile and persisted

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::kv::KvStore;
use crate::random::{base36_token, RandomSource};

/// Opaque per-profile visitor identifier (`user_` + 9 base-36 chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(String);

impl VisitorId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate<R: RandomSource + ?Sized>(source: &mut R) -> Self {
        Self(format!("user_{}", base36_token(source, 9)))
    }

    /// Load the persisted identifier, or generate and persist a new one.
    ///
    /// Storage failures never propagate: an unreadable store yields a fresh
    /// id for this page, and a failed write leaves it unpersisted.
    pub fn load_or_create<S, R>(store: &S, key: &str, source: &mut R) -> Self
    where
        S: KvStore + ?Sized,
        R: RandomSource + ?Sized,
    {
        match store.get(key) {
            Ok(Some(existing)) if !existing.is_empty() => return Self(existing),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to read visitor id"),
        }

        let fresh = Self::generate(source);
        if let Err(e) = store.set(key, fresh.0.clone()) {
            warn!(error = %e, "Failed to persist visitor id");
        }
        fresh
    }

    /// Identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
