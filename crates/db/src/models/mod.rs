//! Row structs and DTOs.
//!
//! Row structs mirror table columns and convert into the domain types of
//! `arbor_core`. Text columns holding enum names are parsed on conversion.

pub mod entity;
pub mod entity_version;
pub mod user_role;
