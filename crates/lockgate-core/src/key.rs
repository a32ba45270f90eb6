//! Resource keys and the lock identities derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Request header that carries the resource key.
pub const RESOURCE_KEY_HEADER: &str = "X-Lock-Resource-Key";

/// Prefix that isolates gate leases from other users of the same store.
pub const LOCK_NAMESPACE: &str = "lock:generic";

/// Opaque, non-empty identifier of the protected resource.
///
/// Many in-flight requests may carry the same key; those are the ones the
/// gate serializes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Validates a raw key. Empty and whitespace-only keys are rejected.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ConfigError::EmptyResourceKey);
        }
        Ok(ResourceKey(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespaced identity handed to the lock service.
    pub fn identity(&self) -> LockIdentity {
        LockIdentity(format!("{}:{}", LOCK_NAMESPACE, self.0))
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-level name of a lease, `lock:generic:<resource-key>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockIdentity(String);

impl LockIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&ResourceKey> for LockIdentity {
    fn from(key: &ResourceKey) -> Self {
        key.identity()
    }
}
