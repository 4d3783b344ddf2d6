//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept any Postgres executor (`&PgPool` or `&mut *tx`) as the first
//! argument.

pub mod entity_repo;
pub mod entity_version_repo;
pub mod hierarchy_repo;
pub mod user_role_repo;

pub use entity_repo::EntityRepo;
pub use entity_version_repo::EntityVersionRepo;
pub use hierarchy_repo::HierarchyRepo;
pub use user_role_repo::UserRoleRepo;
