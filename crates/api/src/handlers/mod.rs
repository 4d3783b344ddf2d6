pub mod admin_roles;
pub mod entity;
pub mod permissions;
