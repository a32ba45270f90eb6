//! Schema types for lease inspection.

use serde::Serialize;

use lockgate_core::LeaseStatus;

/// Live leases in the in-memory store.
#[derive(Debug, Clone, Serialize)]
pub struct LeaseListResponse {
    pub leases: Vec<LeaseStatus>,
}
