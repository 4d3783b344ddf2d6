//! Arbor API server library.
//!
//! Exposes the building blocks (config, state, auth, error handling,
//! handlers, routes) so integration tests and the binary entrypoint can
//! both access them.

pub mod router;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;
