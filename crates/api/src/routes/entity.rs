//! Route definitions for the entity hierarchy.
//!
//! Registered under `/entities`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::entity;
use crate::state::AppState;

/// Entity routes, registered as `/entities`.
///
/// ```text
/// POST   /                          create_entity
/// GET    /tree                      get_tree
/// GET    /{id}                      get_entity
/// PUT    /{id}                      update_entity
/// DELETE /{id}                      delete_entity
/// GET    /{id}/versions             list_versions
/// GET    /{id}/versions/{version}   get_version
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(entity::create_entity))
        .route("/tree", get(entity::get_tree))
        .route(
            "/{id}",
            get(entity::get_entity)
                .put(entity::update_entity)
                .delete(entity::delete_entity),
        )
        .route("/{id}/versions", get(entity::list_versions))
        .route("/{id}/versions/{version}", get(entity::get_version))
}
