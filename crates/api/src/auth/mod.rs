//! Authentication primitives.
//!
//! - [`jwt`] -- JWT access-token validation and minting.

pub mod jwt;
