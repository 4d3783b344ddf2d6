//! Domain core for the arbor content hierarchy.
//!
//! Holds everything that does not touch a database: the error taxonomy,
//! entity and access-level types, permission resolution, the lifecycle
//! engine that keeps the tree valid, and the tree builder. Persistence is
//! reached only through the store traits in [`hierarchy`].

pub mod config;
pub mod entity;
pub mod error;
pub mod hierarchy;
pub mod lifecycle;
pub mod memory;
pub mod permissions;
pub mod roles;
pub mod tree;
pub mod types;
