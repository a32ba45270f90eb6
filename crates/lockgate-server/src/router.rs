//! Router assembly for the lock gate HTTP API.
//!
//! [`build_router`] wires the handlers to their routes. Routes that mutate a
//! resource sit behind the lock gate middleware; inspection routes do not.

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{lock_gate, GateState};
use crate::state::{AppLockService, AppState};

/// Builds the complete axum router.
///
/// TraceLayer provides request-level logging via tracing.
pub fn build_router(state: AppState) -> Router {
    let guarded = Router::new()
        .route(
            "/resources/process",
            post(handlers::resources::process_resource),
        )
        .route_layer(from_fn_with_state(
            GateState {
                gate: state.gate.clone(),
                shutdown: state.shutdown_signal(),
            },
            lock_gate::<AppLockService>,
        ));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/leases", get(handlers::leases::list_leases))
        .merge(guarded)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
