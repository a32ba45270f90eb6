//! Lease inspection handlers.

use axum::extract::State;
use axum::Json;

use crate::schema::common::ApiResponse;
use crate::schema::leases::LeaseListResponse;
use crate::state::AppState;

/// Lists live leases in the in-memory store.
///
/// `GET /leases`
pub async fn list_leases(State(state): State<AppState>) -> Json<ApiResponse<LeaseListResponse>> {
    Json(ApiResponse::ok(LeaseListResponse {
        leases: state.lease_store.status(),
    }))
}
