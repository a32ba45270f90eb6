//! Request-scoped distributed mutual exclusion.
//!
//! The [`ResourceLockGate`] serializes a downstream handler per resource key by
//! holding a short-lived lease from a [`LockService`] for the duration of the
//! call. The lock service is an explicit collaborator: [`RetryingLockService`]
//! drives any single-shot [`LeaseStore`] with bounded retry, and
//! [`InMemoryLeaseStore`] is the process-local store used by the server binary
//! and the tests.

pub mod backoff;
pub mod context;
pub mod error;
pub mod gate;
pub mod key;
pub mod lease;
pub mod memory;
pub mod retrying;
pub mod service;

// Re-export commonly used types
pub use backoff::Backoff;
pub use context::{cancellation, CancelSignal, Canceller, RequestContext};
pub use error::{ConfigError, ErrorKind, GateError, LockServiceError, ReleaseWarning};
pub use gate::ResourceLockGate;
pub use key::{LockIdentity, ResourceKey, LOCK_NAMESPACE, RESOURCE_KEY_HEADER};
pub use lease::{validate_ttl, LeaseOptions, LeaseStatus, LockHandle, MAX_LEASE_TTL};
pub use memory::InMemoryLeaseStore;
pub use retrying::{AdapterConfig, RetryingLockService};
pub use service::{LeaseStore, LockService};
