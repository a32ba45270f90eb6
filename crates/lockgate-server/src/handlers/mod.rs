//! HTTP handler modules for the lock gate server.
//!
//! Handlers behind the gate run only while the request's lease is held; they
//! read the resolved [`lockgate_core::RequestContext`] from request extensions.

pub mod health;
pub mod leases;
pub mod resources;
