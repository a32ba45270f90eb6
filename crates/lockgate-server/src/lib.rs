//! HTTP server that puts request handlers behind the resource lock gate.
//!
//! Requests name the resource they touch in the `X-Lock-Resource-Key` header;
//! guarded routes run only while that resource's lease is held, and contended
//! resources answer `423 Locked`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod schema;
pub mod state;
