//! Route definitions for role grant administration.
//!
//! Registered under `/admin`. Every handler requires the unrestricted admin
//! grant.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::admin_roles;
use crate::state::AppState;

/// ```text
/// GET    /users/{user_id}/roles     list_user_roles
/// POST   /users/{user_id}/roles     grant_role
/// DELETE /roles/{id}                revoke_role
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/users/{user_id}/roles",
            get(admin_roles::list_user_roles).post(admin_roles::grant_role),
        )
        .route("/roles/{id}", delete(admin_roles::revoke_role))
}
