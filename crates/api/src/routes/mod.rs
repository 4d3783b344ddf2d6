pub mod admin;
pub mod entity;
pub mod health;
pub mod permissions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /entities/tree                              visible tree (read)
/// /entities                                   create (write on parent)
/// /entities/{id}                              get, update, delete
/// /entities/{id}/versions                     version history
/// /entities/{id}/versions/{version}           one version
///
/// /permissions                                caller's direct grants (?level=)
///
/// /admin/users/{user_id}/roles                list, grant (admin only)
/// /admin/roles/{id}                           revoke (admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/entities", entity::router())
        .nest("/permissions", permissions::router())
        .nest("/admin", admin::router())
}
