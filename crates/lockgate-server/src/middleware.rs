//! Axum middleware that puts routes behind the resource lock gate.
//!
//! The resource key comes from the `X-Lock-Resource-Key` header. The
//! [`RequestContext`] built from it is inserted into the request extensions
//! so handlers can read the key.
//!
//! Two things cancel a request. Server shutdown fires the context's cancel
//! signal, so a request still waiting for its lease gives up with a
//! cancellation error. A client disconnect makes axum drop the request
//! future; nobody is left to answer, and the gate's drop guard releases any
//! lease already held.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use lockgate_core::{CancelSignal, LockService, RequestContext, ResourceLockGate, RESOURCE_KEY_HEADER};

use crate::error::ApiError;

/// State handed to [`lock_gate`].
pub struct GateState<S> {
    pub gate: ResourceLockGate<S>,
    /// Cancellation shared by every request through this layer.
    pub shutdown: CancelSignal,
}

impl<S> Clone for GateState<S> {
    fn clone(&self) -> Self {
        GateState {
            gate: self.gate.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

/// Extracts the raw resource key. Absent or non-UTF-8 values become empty,
/// which the gate rejects as a configuration error.
pub fn extract_resource_key(headers: &HeaderMap) -> String {
    headers
        .get(RESOURCE_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Runs the rest of the stack under the lease for the request's key.
///
/// Install with `axum::middleware::from_fn_with_state(state, lock_gate::<S>)`.
pub async fn lock_gate<S: LockService>(
    State(state): State<GateState<S>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::new(extract_resource_key(request.headers()))
        .with_cancellation(state.shutdown.clone());

    let response = state
        .gate
        .guard(ctx, move |ctx| {
            let mut request = request;
            request.extensions_mut().insert(ctx);
            next.run(request)
        })
        .await?;

    Ok(response)
}
