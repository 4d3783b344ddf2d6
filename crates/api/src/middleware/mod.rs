//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the acting user from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires the unrestricted admin grant.

pub mod auth;
pub mod rbac;
