//! Process-local lease table with TTL-based expiry.
//!
//! [`InMemoryLeaseStore`] gives mutual exclusion among callers that share the
//! same instance, so it stands in for a networked store in single-process
//! deployments and in tests. Expired leases are treated as free on the next
//! acquire; a background sweep drops the ones nobody asks for again.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::LockServiceError;
use crate::key::LockIdentity;
use crate::lease::{lease_deadline, LeaseStatus};
use crate::service::LeaseStore;

/// One lease as recorded in the table.
#[derive(Debug, Clone)]
struct LeaseEntry {
    token: Uuid,
    acquired_at: Instant,
    expires_at: Instant,
}

impl LeaseEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Lease table keyed by lock identity.
///
/// Uses `DashMap` so concurrent tasks touching different identities do not
/// contend on a single mutex.
pub struct InMemoryLeaseStore {
    leases: DashMap<String, LeaseEntry>,
}

impl InMemoryLeaseStore {
    pub fn new() -> Self {
        InMemoryLeaseStore {
            leases: DashMap::new(),
        }
    }

    fn acquire_now(
        &self,
        identity: &LockIdentity,
        token: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockServiceError> {
        let now = Instant::now();
        let fresh = LeaseEntry {
            token,
            acquired_at: now,
            expires_at: lease_deadline(now, ttl).map_err(LockServiceError::InvalidTtl)?,
        };

        let acquired = match self.leases.entry(identity.as_str().to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                true
            }
            Entry::Occupied(mut slot) => {
                if slot.get().is_live(now) {
                    false
                } else {
                    slot.insert(fresh);
                    true
                }
            }
        };
        Ok(acquired)
    }

    fn release_now(&self, identity: &LockIdentity, token: Uuid) -> bool {
        let now = Instant::now();
        // An expired entry under our token is removed too, but reported as not owned.
        match self
            .leases
            .remove_if(identity.as_str(), |_, lease| lease.token == token)
        {
            Some((_, lease)) => lease.is_live(now),
            None => false,
        }
    }

    fn extend_now(
        &self,
        identity: &LockIdentity,
        token: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockServiceError> {
        let now = Instant::now();
        let expires_at = lease_deadline(now, ttl).map_err(LockServiceError::InvalidTtl)?;
        match self.leases.get_mut(identity.as_str()) {
            Some(mut lease) if lease.token == token && lease.is_live(now) => {
                lease.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Returns whether `identity` currently has a live lease.
    pub fn is_held(&self, identity: &LockIdentity) -> bool {
        let now = Instant::now();
        self.leases
            .get(identity.as_str())
            .map(|lease| lease.is_live(now))
            .unwrap_or(false)
    }

    /// Lists live leases, sorted by identity.
    pub fn status(&self) -> Vec<LeaseStatus> {
        let now = Instant::now();
        let mut live: Vec<LeaseStatus> = self
            .leases
            .iter()
            .filter(|entry| entry.value().is_live(now))
            .map(|entry| {
                let lease = entry.value();
                LeaseStatus {
                    identity: entry.key().clone(),
                    token: lease.token,
                    held_ms: now.duration_since(lease.acquired_at).as_millis() as u64,
                    expires_in_ms: lease.expires_at.duration_since(now).as_millis() as u64,
                }
            })
            .collect();
        live.sort_by(|a, b| a.identity.cmp(&b.identity));
        live
    }

    /// Removes expired leases and returns their identities.
    pub fn sweep_expired(&self) -> Vec<String> {
        let now = Instant::now();
        let mut swept = Vec::new();
        self.leases.retain(|identity, lease| {
            let live = lease.is_live(now);
            if !live {
                swept.push(identity.clone());
            }
            live
        });
        swept
    }

    /// Spawns a background tokio task that periodically sweeps expired leases.
    pub fn start_expiry_sweep(self: &Arc<Self>, interval: Duration) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tick.tick().await;
                let swept = store.sweep_expired();
                if !swept.is_empty() {
                    tracing::info!(count = swept.len(), leases = ?swept, "swept expired leases");
                }
            }
        });
    }
}

impl Default for InMemoryLeaseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaseStore for InMemoryLeaseStore {
    async fn try_acquire(
        &self,
        identity: &LockIdentity,
        token: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockServiceError> {
        self.acquire_now(identity, token, ttl)
    }

    async fn release(&self, identity: &LockIdentity, token: Uuid) -> Result<bool, LockServiceError> {
        Ok(self.release_now(identity, token))
    }

    async fn extend(
        &self,
        identity: &LockIdentity,
        token: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockServiceError> {
        self.extend_now(identity, token, ttl)
    }
}
