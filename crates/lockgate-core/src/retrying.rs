//! Bounded-retry lock service over a single-shot [`LeaseStore`].

use std::time::Duration;

use tokio::time::{sleep, timeout};
use uuid::Uuid;

use crate::backoff::Backoff;
use crate::error::LockServiceError;
use crate::key::LockIdentity;
use crate::lease::{LeaseOptions, LockHandle};
use crate::service::{LeaseStore, LockService};

/// Retry behavior of the adapter. The attempt budget itself comes from
/// [`LeaseOptions`] on each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Delay between attempts.
    pub backoff: Backoff,
    /// Upper bound on a single store round trip.
    pub attempt_timeout: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            backoff: Backoff::default(),
            attempt_timeout: Duration::from_secs(1),
        }
    }
}

/// Lock service that tries a [`LeaseStore`] up to `max_attempts` times.
///
/// Each acquisition uses one random owner token for all of its attempts. An
/// attempt that errors or times out is followed by a best-effort release of
/// that token, so a write that landed late cannot leave an orphaned lease
/// behind until its TTL.
///
/// Total wait is bounded by `max_attempts * attempt_timeout` plus the backoff
/// delays between attempts.
pub struct RetryingLockService<S> {
    store: S,
    config: AdapterConfig,
}

impl<S: LeaseStore> RetryingLockService<S> {
    pub fn new(store: S, config: AdapterConfig) -> Self {
        RetryingLockService { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    async fn discard_attempt(&self, identity: &LockIdentity, token: Uuid) {
        if let Err(err) = self.store.release(identity, token).await {
            tracing::debug!(%identity, error = %err, "cleanup after failed attempt did not complete");
        }
    }
}

impl<S: LeaseStore> LockService for RetryingLockService<S> {
    async fn acquire(
        &self,
        identity: &LockIdentity,
        lease: LeaseOptions,
    ) -> Result<LockHandle, LockServiceError> {
        let token = Uuid::new_v4();
        let max_attempts = lease.max_attempts();
        let mut contended = false;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let outcome = timeout(
                self.config.attempt_timeout,
                self.store.try_acquire(identity, token, lease.ttl()),
            )
            .await;

            match outcome {
                Ok(Ok(true)) => {
                    return Ok(LockHandle::new(identity.clone(), token, lease.ttl(), attempt));
                }
                Ok(Ok(false)) => {
                    contended = true;
                    tracing::debug!(%identity, attempt, "lease held elsewhere");
                }
                Ok(Err(err)) => {
                    tracing::warn!(%identity, attempt, error = %err, "lease attempt failed");
                    self.discard_attempt(identity, token).await;
                    last_error = Some(err);
                }
                Err(_) => {
                    tracing::warn!(%identity, attempt, "lease attempt timed out");
                    self.discard_attempt(identity, token).await;
                    last_error = Some(LockServiceError::AttemptTimedOut {
                        identity: identity.to_string(),
                    });
                }
            }

            if attempt < max_attempts {
                sleep(self.config.backoff.delay_after(attempt)).await;
            }
        }

        match last_error {
            // Backend failures only count when no attempt ever saw the lease held.
            Some(err) if !contended => Err(err),
            _ => Err(LockServiceError::Exhausted {
                identity: identity.to_string(),
                attempts: max_attempts,
            }),
        }
    }

    async fn release(&self, handle: &LockHandle) -> Result<bool, LockServiceError> {
        self.store.release(handle.identity(), handle.token()).await
    }

    async fn extend(
        &self,
        handle: &mut LockHandle,
        ttl: Duration,
    ) -> Result<bool, LockServiceError> {
        let extended = self
            .store
            .extend(handle.identity(), handle.token(), ttl)
            .await?;
        if extended {
            handle.extended(ttl);
        }
        Ok(extended)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;
    use crate::key::ResourceKey;
    use crate::memory::InMemoryLeaseStore;

    fn identity(key: &str) -> LockIdentity {
        ResourceKey::parse(key).unwrap().identity()
    }

    fn service(store: Arc<InMemoryLeaseStore>, delay_ms: u64) -> RetryingLockService<Arc<InMemoryLeaseStore>> {
        RetryingLockService::new(
            store,
            AdapterConfig {
                backoff: Backoff::fixed(Duration::from_millis(delay_ms)),
                attempt_timeout: Duration::from_millis(200),
            },
        )
    }

    /// Store that fails every attempt and counts calls.
    #[derive(Default)]
    struct BrokenStore {
        attempts: AtomicUsize,
        releases: AtomicUsize,
    }

    impl LeaseStore for BrokenStore {
        async fn try_acquire(
            &self,
            _identity: &LockIdentity,
            _token: Uuid,
            _ttl: Duration,
        ) -> Result<bool, LockServiceError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(LockServiceError::Backend("connection refused".into()))
        }

        async fn release(&self, _identity: &LockIdentity, _token: Uuid) -> Result<bool, LockServiceError> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }

        async fn extend(
            &self,
            _identity: &LockIdentity,
            _token: Uuid,
            _ttl: Duration,
        ) -> Result<bool, LockServiceError> {
            Ok(false)
        }
    }

    /// Store whose attempts hang past any reasonable timeout, except the
    /// one numbered `contended_on`, which finds the lease held.
    struct HangingStore {
        contended_on: Option<usize>,
        attempts: AtomicUsize,
        releases: AtomicUsize,
    }

    impl HangingStore {
        fn new(contended_on: Option<usize>) -> Self {
            HangingStore {
                contended_on,
                attempts: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
            }
        }
    }

    impl LeaseStore for HangingStore {
        async fn try_acquire(
            &self,
            _identity: &LockIdentity,
            _token: Uuid,
            _ttl: Duration,
        ) -> Result<bool, LockServiceError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if self.contended_on == Some(attempt) {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(true)
        }

        async fn release(&self, _identity: &LockIdentity, _token: Uuid) -> Result<bool, LockServiceError> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        }

        async fn extend(
            &self,
            _identity: &LockIdentity,
            _token: Uuid,
            _ttl: Duration,
        ) -> Result<bool, LockServiceError> {
            Ok(false)
        }
    }

    fn hanging(contended_on: Option<usize>) -> RetryingLockService<HangingStore> {
        RetryingLockService::new(
            HangingStore::new(contended_on),
            AdapterConfig {
                backoff: Backoff::fixed(Duration::from_millis(10)),
                attempt_timeout: Duration::from_millis(50),
            },
        )
    }

    #[tokio::test]
    async fn first_attempt_wins_on_free_lease() {
        let store = Arc::new(InMemoryLeaseStore::new());
        let svc = service(Arc::clone(&store), 10);
        let id = identity("order-42");
        let lease = LeaseOptions::new(Duration::from_secs(5), 3).unwrap();

        let handle = svc.acquire(&id, lease).await.unwrap();
        assert_eq!(handle.attempts(), 1);
        assert!(store.is_held(&id));

        assert!(svc.release(&handle).await.unwrap());
        assert!(!store.is_held(&id));
    }

    #[tokio::test]
    async fn exhausts_budget_with_backoff_between_attempts() {
        let store = Arc::new(InMemoryLeaseStore::new());
        let svc = service(Arc::clone(&store), 50);
        let id = identity("busy");
        let lease = LeaseOptions::new(Duration::from_secs(5), 3).unwrap();
        let _held = svc.acquire(&id, lease).await.unwrap();

        let started = Instant::now();
        let err = svc.acquire(&id, lease).await.unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(
            err,
            LockServiceError::Exhausted {
                identity: "lock:generic:busy".into(),
                attempts: 3
            }
        );
        // two sleeps between three attempts
        assert!(elapsed >= Duration::from_millis(100), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(1), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn picks_up_lease_once_holder_lets_go() {
        let store = Arc::new(InMemoryLeaseStore::new());
        let svc = Arc::new(service(Arc::clone(&store), 20));
        let id = identity("handover");
        let lease = LeaseOptions::new(Duration::from_secs(5), 50).unwrap();
        let held = svc.acquire(&id, lease).await.unwrap();

        let waiter = {
            let svc = Arc::clone(&svc);
            let id = id.clone();
            tokio::spawn(async move { svc.acquire(&id, lease).await })
        };
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(svc.release(&held).await.unwrap());

        let handle = waiter.await.unwrap().unwrap();
        assert!(handle.attempts() > 1);
    }

    #[tokio::test]
    async fn backend_errors_surface_and_clean_up_each_attempt() {
        let svc = RetryingLockService::new(
            BrokenStore::default(),
            AdapterConfig {
                backoff: Backoff::fixed(Duration::from_millis(1)),
                attempt_timeout: Duration::from_millis(100),
            },
        );
        let lease = LeaseOptions::new(Duration::from_secs(5), 4).unwrap();

        let err = svc.acquire(&identity("x"), lease).await.unwrap_err();
        assert_eq!(err, LockServiceError::Backend("connection refused".into()));
        assert_eq!(svc.store().attempts.load(Ordering::SeqCst), 4);
        assert_eq!(svc.store().releases.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn timed_out_attempts_are_bounded_and_cleaned_up() {
        let svc = hanging(None);
        let lease = LeaseOptions::new(Duration::from_secs(5), 3).unwrap();

        let started = Instant::now();
        let err = svc.acquire(&identity("slow"), lease).await.unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(
            err,
            LockServiceError::AttemptTimedOut {
                identity: "lock:generic:slow".into()
            }
        );
        // three 50ms timeouts plus two 10ms pauses
        assert!(elapsed >= Duration::from_millis(170), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(1), "elapsed {elapsed:?}");
        assert_eq!(svc.store().attempts.load(Ordering::SeqCst), 3);
        assert_eq!(svc.store().releases.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn timeouts_after_seeing_contention_report_exhaustion() {
        let svc = hanging(Some(2));
        let lease = LeaseOptions::new(Duration::from_secs(5), 3).unwrap();

        let err = svc.acquire(&identity("slow"), lease).await.unwrap_err();

        assert_eq!(
            err,
            LockServiceError::Exhausted {
                identity: "lock:generic:slow".into(),
                attempts: 3
            }
        );
        assert_eq!(svc.store().attempts.load(Ordering::SeqCst), 3);
        // only the two timed-out attempts need cleanup
        assert_eq!(svc.store().releases.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn extend_with_out_of_range_ttl_leaves_handle_alone() {
        let store = Arc::new(InMemoryLeaseStore::new());
        let svc = service(Arc::clone(&store), 10);
        let id = identity("long-job");
        let lease = LeaseOptions::new(Duration::from_secs(5), 1).unwrap();
        let mut handle = svc.acquire(&id, lease).await.unwrap();
        let before = handle.expires_at();

        let err = svc.extend(&mut handle, Duration::MAX).await.unwrap_err();
        assert!(matches!(err, LockServiceError::InvalidTtl(_)));
        assert_eq!(handle.expires_at(), before);
        assert!(store.is_held(&id));
    }

    #[tokio::test]
    async fn extend_moves_handle_expiry() {
        let store = Arc::new(InMemoryLeaseStore::new());
        let svc = service(Arc::clone(&store), 10);
        let id = identity("long-job");
        let lease = LeaseOptions::new(Duration::from_millis(100), 1).unwrap();
        let mut handle = svc.acquire(&id, lease).await.unwrap();
        let before = handle.expires_at();

        assert!(svc.extend(&mut handle, Duration::from_secs(5)).await.unwrap());
        assert!(handle.expires_at() > before);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.is_held(&id));
    }
}
