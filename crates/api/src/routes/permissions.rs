//! Route definitions for permission introspection.

use axum::routing::get;
use axum::Router;

use crate::handlers::permissions;
use crate::state::AppState;

/// Registered as `/permissions`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(permissions::get_my_permissions))
}
