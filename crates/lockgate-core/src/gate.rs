//! The resource lock gate.
//!
//! [`ResourceLockGate::guard`] runs a downstream handler while holding the
//! lease for the request's resource key:
//!
//! 1. resolve the key and namespace it into a [`LockIdentity`];
//! 2. make exactly one `acquire` call (the service owns all retrying);
//! 3. on success run the handler once with the caller's [`RequestContext`];
//! 4. release the lease on every exit path.
//!
//! Release is tied to a drop guard. A normal return releases inline; a panic
//! in the handler or a dropped `guard` future hands the release to a spawned
//! task, so no exit path skips it. The gate itself keeps no state between
//! calls, and requests for different keys never wait on each other.

use std::future::Future;
use std::sync::Arc;

use crate::context::{CancelSignal, RequestContext};
use crate::error::{GateError, LockServiceError, ReleaseWarning};
use crate::key::{LockIdentity, ResourceKey};
use crate::lease::{LeaseOptions, LockHandle};
use crate::service::LockService;

/// Serializes downstream handlers per resource key.
pub struct ResourceLockGate<S> {
    service: Arc<S>,
    lease: LeaseOptions,
}

impl<S> Clone for ResourceLockGate<S> {
    fn clone(&self) -> Self {
        ResourceLockGate {
            service: Arc::clone(&self.service),
            lease: self.lease,
        }
    }
}

impl<S: LockService> ResourceLockGate<S> {
    /// Wires the gate to an explicitly constructed lock service.
    pub fn new(service: Arc<S>, lease: LeaseOptions) -> Self {
        ResourceLockGate { service, lease }
    }

    pub fn lease(&self) -> LeaseOptions {
        self.lease
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Runs `handler` under the lease for `ctx`'s resource key.
    ///
    /// The handler's output is returned unchanged, whatever it is. Errors
    /// returned here come only from the acquisition phase, in which case the
    /// handler never ran.
    pub async fn guard<F, Fut, T>(&self, ctx: RequestContext, handler: F) -> Result<T, GateError>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = T>,
    {
        let key = ResourceKey::parse(ctx.resource_key())?;
        let identity = key.identity();

        let handle = self.acquire(&key, &identity, ctx.cancel_signal()).await?;
        let held = HeldLease::new(Arc::clone(&self.service), handle, key);

        let output = handler(ctx).await;
        held.release().await;
        Ok(output)
    }

    async fn acquire(
        &self,
        key: &ResourceKey,
        identity: &LockIdentity,
        cancel: &CancelSignal,
    ) -> Result<LockHandle, GateError> {
        if cancel.is_cancelled() {
            tracing::debug!(resource = %key, "request cancelled before lock acquisition");
            return Err(GateError::Cancelled {
                resource_key: key.to_string(),
            });
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.service.acquire(identity, self.lease) => Some(result),
        };

        match outcome {
            None => {
                tracing::debug!(resource = %key, "lock acquisition abandoned by caller");
                Err(GateError::Cancelled {
                    resource_key: key.to_string(),
                })
            }
            Some(Ok(handle)) if cancel.is_cancelled() => {
                // Lease granted after the caller gave up: hand it straight back.
                tracing::debug!(resource = %key, "releasing lease granted after cancellation");
                HeldLease::new(Arc::clone(&self.service), handle, key.clone())
                    .release()
                    .await;
                Err(GateError::Cancelled {
                    resource_key: key.to_string(),
                })
            }
            Some(Ok(handle)) => {
                tracing::debug!(resource = %key, attempts = handle.attempts(), "lock acquired");
                Ok(handle)
            }
            Some(Err(LockServiceError::Exhausted { attempts, .. })) => {
                let err = GateError::Contention {
                    resource_key: key.to_string(),
                    attempts,
                };
                tracing::error!(resource = %key, error = %err, "failed acquiring lock");
                Err(err)
            }
            Some(Err(source)) => {
                tracing::error!(resource = %key, error = %source, "failed acquiring lock");
                Err(GateError::LockService {
                    resource_key: key.to_string(),
                    source,
                })
            }
        }
    }
}

/// A held lease that is released exactly once, even if never awaited.
struct HeldLease<S: LockService> {
    service: Arc<S>,
    handle: Option<LockHandle>,
    key: ResourceKey,
}

impl<S: LockService> HeldLease<S> {
    fn new(service: Arc<S>, handle: LockHandle, key: ResourceKey) -> Self {
        HeldLease {
            service,
            handle: Some(handle),
            key,
        }
    }

    async fn release(mut self) {
        if let Some(handle) = self.handle.as_ref() {
            release_lease(self.service.as_ref(), handle, &self.key).await;
        }
        self.handle = None;
    }
}

impl<S: LockService> Drop for HeldLease<S> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let service = Arc::clone(&self.service);
        let key = self.key.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    release_lease(service.as_ref(), &handle, &key).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    resource = %key,
                    identity = %handle.identity(),
                    "no runtime to release lease; it will lapse at ttl"
                );
            }
        }
    }
}

async fn release_lease<S: LockService>(service: &S, handle: &LockHandle, key: &ResourceKey) {
    let warning = match service.release(handle).await {
        Ok(true) => {
            tracing::debug!(resource = %key, "lock released");
            return;
        }
        Ok(false) => ReleaseWarning::NotOwner {
            identity: handle.identity().to_string(),
        },
        Err(source) => ReleaseWarning::Failed {
            identity: handle.identity().to_string(),
            source,
        },
    };
    tracing::warn!(resource = %key, error = %warning, "failed releasing lock");
}
