//! Common API response wrapper types.

use serde::Serialize;

/// Standard envelope for successful responses.
///
/// Errors use the same shape with `success: false` and an `error` object,
/// produced by [`crate::error::ApiError`].
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Always `true` for successful responses.
    pub success: bool,
    /// Response payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful response with data.
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
        }
    }
}
