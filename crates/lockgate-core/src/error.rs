//! Error taxonomy for the lock gate.
//!
//! Every failure the gate can report is a variant of a closed `thiserror`
//! enum. [`GateError::kind`] gives the tag callers use to pick a response
//! code, so nothing downstream has to inspect error types at run time.

use serde::Serialize;
use thiserror::Error;

/// Invalid static configuration or a request that carries no usable key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The request carried no resource key, or only whitespace.
    #[error("resource key must not be empty")]
    EmptyResourceKey,

    /// Lease duration of zero.
    #[error("lease ttl must be greater than zero")]
    ZeroTtl,

    /// Lease duration above the supported maximum.
    #[error("lease ttl of {ttl_secs}s exceeds the maximum of {max_secs}s")]
    TtlTooLong { ttl_secs: u64, max_secs: u64 },

    /// Attempt budget below one.
    #[error("max attempts must be at least 1 (got {0})")]
    NoAttempts(u32),

    /// A configuration value could not be parsed.
    #[error("invalid value for {name}: {reason}")]
    InvalidSetting { name: String, reason: String },
}

/// Failures reported by a lock service adapter or its backing store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockServiceError {
    /// Every attempt found the lease held by someone else.
    #[error("lock {identity} still held after {attempts} attempt(s)")]
    Exhausted { identity: String, attempts: u32 },

    /// A single attempt did not complete within the per-attempt timeout.
    #[error("attempt on {identity} timed out")]
    AttemptTimedOut { identity: String },

    /// A store was asked for a lease duration it cannot represent.
    #[error("invalid lease ttl: {0}")]
    InvalidTtl(ConfigError),

    /// The backing store could not be reached or answered with an error.
    #[error("lease store unavailable: {0}")]
    Backend(String),
}

/// Errors surfaced by [`crate::ResourceLockGate::guard`].
///
/// Only acquisition-phase failures appear here. The downstream handler's own
/// output is returned unchanged, and release problems are logged as
/// [`ReleaseWarning`] instead of failing the request.
#[derive(Debug, Error)]
pub enum GateError {
    /// Missing key or invalid gate configuration. Not retried.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Acquisition attempts were exhausted without getting the lease.
    #[error("failed acquiring lock for resource {resource_key}")]
    Contention { resource_key: String, attempts: u32 },

    /// The caller gave up before the lease was obtained.
    #[error("lock acquisition for resource {resource_key} was cancelled")]
    Cancelled { resource_key: String },

    /// The lock service failed for a reason other than contention.
    #[error("lock service failure for resource {resource_key}: {source}")]
    LockService {
        resource_key: String,
        #[source]
        source: LockServiceError,
    },
}

/// Explicit kind tag carried by every [`GateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Configuration,
    ResourceLocked,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code for API responses.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "CONFIGURATION_ERROR",
            ErrorKind::ResourceLocked => "RESOURCE_LOCKED",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl GateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::Configuration(_) => ErrorKind::Configuration,
            GateError::Contention { .. } => ErrorKind::ResourceLocked,
            GateError::Cancelled { .. } => ErrorKind::Cancelled,
            GateError::LockService { .. } => ErrorKind::Internal,
        }
    }

    /// The resource key the error refers to, when one was resolved.
    pub fn resource_key(&self) -> Option<&str> {
        match self {
            GateError::Configuration(_) => None,
            GateError::Contention { resource_key, .. }
            | GateError::Cancelled { resource_key }
            | GateError::LockService { resource_key, .. } => Some(resource_key),
        }
    }
}

/// A release that did not go cleanly.
///
/// Either outcome means the lease may have lapsed while the handler was still
/// running, so another holder could have overlapped with it.
#[derive(Debug, Error)]
pub enum ReleaseWarning {
    /// The handle was no longer the live owner when release ran.
    #[error("lease {identity} was no longer owned at release")]
    NotOwner { identity: String },

    /// The release call itself failed.
    #[error("releasing lease {identity} failed: {source}")]
    Failed {
        identity: String,
        #[source]
        source: LockServiceError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_stable_codes() {
        let contention = GateError::Contention {
            resource_key: "order-42".into(),
            attempts: 3,
        };
        assert_eq!(contention.kind(), ErrorKind::ResourceLocked);
        assert_eq!(contention.kind().code(), "RESOURCE_LOCKED");
        assert_eq!(
            contention.to_string(),
            "failed acquiring lock for resource order-42"
        );

        let config = GateError::from(ConfigError::EmptyResourceKey);
        assert_eq!(config.kind(), ErrorKind::Configuration);
        assert_eq!(config.resource_key(), None);
    }

    #[test]
    fn cancelled_is_distinct_from_contention() {
        let cancelled = GateError::Cancelled {
            resource_key: "k".into(),
        };
        assert_eq!(cancelled.kind(), ErrorKind::Cancelled);
        assert_ne!(cancelled.kind(), ErrorKind::ResourceLocked);
        assert_eq!(cancelled.resource_key(), Some("k"));
    }

    #[test]
    fn kind_serializes_as_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::ResourceLocked).unwrap();
        assert_eq!(json, "\"RESOURCE_LOCKED\"");
    }
}
