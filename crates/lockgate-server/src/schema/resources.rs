//! Schema types for guarded resource processing.

use serde::{Deserialize, Serialize};

/// Work to perform while the resource's lease is held.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessRequest {
    /// How long to simulate work, in milliseconds.
    #[serde(default)]
    pub hold_ms: u64,
    /// Fail the handler after the work, to exercise error pass-through.
    #[serde(default)]
    pub fail: bool,
}

/// Result of processing a resource under its lease.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    pub resource_key: String,
    pub held_ms: u64,
}
