//! Guarded resource processing.

use std::time::Duration;

use axum::extract::State;
use axum::{Extension, Json};
use tokio::time::Instant;

use lockgate_core::RequestContext;

use crate::error::ApiError;
use crate::schema::common::ApiResponse;
use crate::schema::resources::{ProcessRequest, ProcessResponse};
use crate::state::AppState;

/// Simulates work on the resource named by `X-Lock-Resource-Key`.
///
/// `hold_ms` may not exceed the lease ttl, so the work never outlives the
/// lease it runs under.
///
/// `POST /resources/process`
pub async fn process_resource(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<ApiResponse<ProcessResponse>>, ApiError> {
    let hold = Duration::from_millis(req.hold_ms);
    let ttl = state.gate.lease().ttl();
    if hold > ttl {
        return Err(ApiError::BadRequest(format!(
            "hold_ms {} exceeds the lease ttl of {}ms",
            req.hold_ms,
            ttl.as_millis()
        )));
    }

    let started = Instant::now();
    if !hold.is_zero() {
        tokio::time::sleep(hold).await;
    }

    if req.fail {
        return Err(ApiError::InternalError(format!(
            "processing resource {} failed",
            ctx.resource_key()
        )));
    }

    Ok(Json(ApiResponse::ok(ProcessResponse {
        resource_key: ctx.resource_key().to_string(),
        held_ms: started.elapsed().as_millis() as u64,
    })))
}
