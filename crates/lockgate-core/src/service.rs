//! Lock service boundary.
//!
//! [`LockService`] is the contract the gate depends on: a lease-based mutual
//! exclusion primitive that retries internally. [`LeaseStore`] is the lower,
//! single-shot layer a backing store implements; [`crate::RetryingLockService`]
//! turns any store into a lock service.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::LockServiceError;
use crate::key::LockIdentity;
use crate::lease::{LeaseOptions, LockHandle};

/// Lease-based mutual exclusion shared by every caller of one backing store.
///
/// Implementations must guarantee that while a handle for an identity is
/// outstanding and its lease has not expired, no other `acquire` for that
/// identity succeeds anywhere. Lease expiry is the only thing that frees a
/// lease whose holder vanished.
///
/// Contention is unordered: when several callers wait on one identity, which
/// of them wins next is up to the store, not first-come-first-served.
pub trait LockService: Send + Sync + 'static {
    /// Acquires the lease, trying at most `lease.max_attempts()` times.
    ///
    /// Exhausting the budget yields [`LockServiceError::Exhausted`]. Dropping
    /// the returned future abandons the acquisition.
    fn acquire(
        &self,
        identity: &LockIdentity,
        lease: LeaseOptions,
    ) -> impl Future<Output = Result<LockHandle, LockServiceError>> + Send;

    /// Releases the lease. Safe to call after expiry.
    ///
    /// Returns whether the handle was still the live owner.
    fn release(
        &self,
        handle: &LockHandle,
    ) -> impl Future<Output = Result<bool, LockServiceError>> + Send;

    /// Pushes a held lease's expiry to `ttl` from now.
    ///
    /// Returns `false` when the handle no longer owns the lease.
    fn extend(
        &self,
        handle: &mut LockHandle,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, LockServiceError>> + Send;
}

/// Single-shot lease operations against a backing store.
///
/// Ownership is by token: only the token that set a lease may release or
/// extend it, and an expired lease counts as free.
pub trait LeaseStore: Send + Sync + 'static {
    /// Sets the lease if it is free or expired. `Ok(false)` means held.
    fn try_acquire(
        &self,
        identity: &LockIdentity,
        token: Uuid,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, LockServiceError>> + Send;

    /// Deletes the lease if `token` owns it. Returns whether it was live.
    fn release(
        &self,
        identity: &LockIdentity,
        token: Uuid,
    ) -> impl Future<Output = Result<bool, LockServiceError>> + Send;

    /// Resets expiry to `ttl` from now if `token` owns a live lease.
    fn extend(
        &self,
        identity: &LockIdentity,
        token: Uuid,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, LockServiceError>> + Send;
}

impl<T: LeaseStore> LeaseStore for Arc<T> {
    fn try_acquire(
        &self,
        identity: &LockIdentity,
        token: Uuid,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, LockServiceError>> + Send {
        (**self).try_acquire(identity, token, ttl)
    }

    fn release(
        &self,
        identity: &LockIdentity,
        token: Uuid,
    ) -> impl Future<Output = Result<bool, LockServiceError>> + Send {
        (**self).release(identity, token)
    }

    fn extend(
        &self,
        identity: &LockIdentity,
        token: Uuid,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, LockServiceError>> + Send {
        (**self).extend(identity, token, ttl)
    }
}
