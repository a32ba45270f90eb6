//! Lease options, lock handles and lease status views.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::ConfigError;
use crate::key::LockIdentity;

/// Longest lease a store will grant, or extend a lease to.
pub const MAX_LEASE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Checks that `ttl` is non-zero and no longer than [`MAX_LEASE_TTL`].
pub fn validate_ttl(ttl: Duration) -> Result<(), ConfigError> {
    if ttl.is_zero() {
        return Err(ConfigError::ZeroTtl);
    }
    if ttl > MAX_LEASE_TTL {
        return Err(too_long(ttl));
    }
    Ok(())
}

/// The instant a lease taken at `from` for `ttl` runs out.
pub(crate) fn lease_deadline(from: Instant, ttl: Duration) -> Result<Instant, ConfigError> {
    validate_ttl(ttl)?;
    from.checked_add(ttl).ok_or_else(|| too_long(ttl))
}

fn too_long(ttl: Duration) -> ConfigError {
    ConfigError::TtlTooLong {
        ttl_secs: ttl.as_secs(),
        max_secs: MAX_LEASE_TTL.as_secs(),
    }
}

/// Lease duration and acquisition attempt budget.
///
/// Fixed when the gate is built and shared by every key. Construction
/// validates both values, so a `LeaseOptions` in hand is always usable.
/// Deserializes from the `{ "retry": 3, "ttlsec": 5 }` shape used by service
/// configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLeaseOptions")]
pub struct LeaseOptions {
    ttl: Duration,
    max_attempts: u32,
}

#[derive(Deserialize)]
struct RawLeaseOptions {
    retry: u32,
    ttlsec: u64,
}

impl TryFrom<RawLeaseOptions> for LeaseOptions {
    type Error = ConfigError;

    fn try_from(raw: RawLeaseOptions) -> Result<Self, Self::Error> {
        LeaseOptions::new(Duration::from_secs(raw.ttlsec), raw.retry)
    }
}

impl LeaseOptions {
    pub fn new(ttl: Duration, max_attempts: u32) -> Result<Self, ConfigError> {
        validate_ttl(ttl)?;
        if max_attempts < 1 {
            return Err(ConfigError::NoAttempts(max_attempts));
        }
        Ok(LeaseOptions { ttl, max_attempts })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Receipt for a held lease.
///
/// Deliberately not `Clone`: the gate invocation that acquired it is the only
/// party allowed to release it.
#[derive(Debug)]
pub struct LockHandle {
    identity: LockIdentity,
    token: Uuid,
    acquired_at: Instant,
    expires_at: Instant,
    attempts: u32,
}

impl LockHandle {
    /// Records a lease granted now under `token`, after `attempts` tries.
    ///
    /// The recorded expiry is capped at [`MAX_LEASE_TTL`] from now.
    pub fn new(identity: LockIdentity, token: Uuid, ttl: Duration, attempts: u32) -> Self {
        let acquired_at = Instant::now();
        LockHandle {
            identity,
            token,
            acquired_at,
            expires_at: capped_deadline(acquired_at, ttl),
            attempts,
        }
    }

    pub fn identity(&self) -> &LockIdentity {
        &self.identity
    }

    /// Owner token presented to the store on release.
    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    /// Expiry as last known to this handle. The store is authoritative.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// How many attempts the acquisition took.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn extended(&mut self, ttl: Duration) {
        self.expires_at = capped_deadline(Instant::now(), ttl);
    }
}

fn capped_deadline(from: Instant, ttl: Duration) -> Instant {
    from.checked_add(ttl.min(MAX_LEASE_TTL)).unwrap_or(from)
}

/// Snapshot of one live lease, for status listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaseStatus {
    pub identity: String,
    pub token: Uuid,
    pub held_ms: u64,
    pub expires_in_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_ttl_and_zero_attempts() {
        assert_eq!(
            LeaseOptions::new(Duration::ZERO, 3),
            Err(ConfigError::ZeroTtl)
        );
        assert_eq!(
            LeaseOptions::new(Duration::from_secs(5), 0),
            Err(ConfigError::NoAttempts(0))
        );
    }

    #[test]
    fn rejects_ttl_beyond_maximum() {
        assert_eq!(
            LeaseOptions::new(Duration::from_secs(u64::MAX), 3),
            Err(ConfigError::TtlTooLong {
                ttl_secs: u64::MAX,
                max_secs: MAX_LEASE_TTL.as_secs(),
            })
        );
        assert!(LeaseOptions::new(MAX_LEASE_TTL, 3).is_ok());
        assert!(LeaseOptions::new(MAX_LEASE_TTL + Duration::from_secs(1), 3).is_err());

        let bad = serde_json::from_str::<LeaseOptions>(
            r#"{ "retry": 3, "ttlsec": 18446744073709551615 }"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn lease_deadline_refuses_out_of_range_ttl() {
        let now = Instant::now();
        assert_eq!(
            lease_deadline(now, Duration::from_secs(5)),
            Ok(now + Duration::from_secs(5))
        );
        assert!(lease_deadline(now, Duration::MAX).is_err());
        assert_eq!(lease_deadline(now, Duration::ZERO), Err(ConfigError::ZeroTtl));
    }

    #[test]
    fn handle_with_huge_ttl_caps_expiry() {
        let identity = crate::key::ResourceKey::parse("k").unwrap().identity();
        let mut handle = LockHandle::new(identity, Uuid::new_v4(), Duration::MAX, 1);
        assert_eq!(handle.expires_at() - handle.acquired_at(), MAX_LEASE_TTL);

        handle.extended(Duration::MAX);
        assert!(handle.expires_at() > handle.acquired_at());
    }

    #[test]
    fn deserializes_from_retry_and_ttlsec() {
        let opts: LeaseOptions =
            serde_json::from_str(r#"{ "retry": 3, "ttlsec": 5 }"#).unwrap();
        assert_eq!(opts.ttl(), Duration::from_secs(5));
        assert_eq!(opts.max_attempts(), 3);

        let bad = serde_json::from_str::<LeaseOptions>(r#"{ "retry": 0, "ttlsec": 5 }"#);
        assert!(bad.is_err());
    }

    #[test]
    fn handle_expiry_follows_ttl() {
        let identity = crate::key::ResourceKey::parse("k").unwrap().identity();
        let handle = LockHandle::new(identity, Uuid::new_v4(), Duration::from_secs(5), 1);
        assert_eq!(
            handle.expires_at() - handle.acquired_at(),
            Duration::from_secs(5)
        );
    }
}
