//! Application state shared by all handlers.

use std::sync::Arc;
use std::time::Duration;

use lockgate_core::{
    cancellation, AdapterConfig, CancelSignal, Canceller, InMemoryLeaseStore, LeaseOptions,
    ResourceLockGate, RetryingLockService,
};

use crate::config::ServerConfig;

/// Lock service the server wires into its gate.
pub type AppLockService = RetryingLockService<Arc<InMemoryLeaseStore>>;

/// Shared application state for the HTTP server.
///
/// The lease store is held here as well as inside the gate's service so that
/// `GET /leases` can report on it.
#[derive(Clone)]
pub struct AppState {
    /// Gate that serializes guarded routes per resource key.
    pub gate: ResourceLockGate<AppLockService>,
    /// Backing lease table.
    pub lease_store: Arc<InMemoryLeaseStore>,
    /// Fired once when the server starts shutting down.
    shutdown: Arc<Canceller>,
}

impl AppState {
    /// Builds the store, adapter and gate, and starts the expiry sweep.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(lease: LeaseOptions, adapter: AdapterConfig, sweep_interval: Duration) -> Self {
        let lease_store = Arc::new(InMemoryLeaseStore::new());
        lease_store.start_expiry_sweep(sweep_interval);

        let service = RetryingLockService::new(Arc::clone(&lease_store), adapter);
        let gate = ResourceLockGate::new(Arc::new(service), lease);

        let (shutdown, _) = cancellation();

        AppState {
            gate,
            lease_store,
            shutdown: Arc::new(shutdown),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.lease, config.adapter, config.sweep_interval)
    }

    /// Cancels every pending and future lock acquisition on guarded routes.
    /// Requests already holding their lease run to completion.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Signal that fires when [`AppState::shutdown`] is called.
    pub fn shutdown_signal(&self) -> CancelSignal {
        self.shutdown.signal()
    }
}
