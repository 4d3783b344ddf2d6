//! Caller permission introspection.

use arbor_core::permissions::get_direct_permissions_by_name;
use arbor_core::roles::ROLE_READ;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, serde::Deserialize)]
pub struct PermissionParams {
    /// `read`, `write`, or `admin`. Defaults to `read`.
    pub level: Option<String>,
}

/// GET /permissions?level=
///
/// The caller's direct grants satisfying `level`, before hierarchy
/// expansion. `is_admin` callers get an empty ID list.
pub async fn get_my_permissions(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PermissionParams>,
) -> AppResult<impl IntoResponse> {
    let level = params.level.as_deref().unwrap_or(ROLE_READ);
    let direct = get_direct_permissions_by_name(&mut state.reader(), auth.actor(), level).await?;
    Ok(Json(DataResponse { data: direct }))
}
