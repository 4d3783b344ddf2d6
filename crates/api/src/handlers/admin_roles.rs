//! Role grant administration. Unrestricted admins only.

use arbor_core::error::CoreError;
use arbor_core::roles::{validate_grant, AccessLevel, UserRole};
use arbor_core::types::DbId;
use arbor_db::models::user_role::CreateUserRole;
use arbor_db::repositories::{EntityRepo, UserRoleRepo};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /admin/users/{user_id}/roles
pub async fn list_user_roles(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let roles = UserRoleRepo::list_by_user(&state.pool, user_id)
        .await?
        .into_iter()
        .map(UserRole::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(DataResponse { data: roles }))
}

/// POST /admin/users/{user_id}/roles
///
/// Read and write grants must name an existing entity. A duplicate grant
/// is a 409.
pub async fn grant_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Json(input): Json<CreateUserRole>,
) -> AppResult<impl IntoResponse> {
    let role = AccessLevel::from_name(&input.role)?;
    validate_grant(role, input.entity_id)?;

    if let Some(entity_id) = input.entity_id {
        if !EntityRepo::exists(&state.pool, entity_id).await? {
            return Err(CoreError::NotFound {
                entity: "Entity",
                id: entity_id,
            }
            .into());
        }
    }

    let row = UserRoleRepo::create(&state.pool, user_id, role, input.entity_id).await?;
    let grant = UserRole::try_from(row)?;

    tracing::info!(
        admin_id = admin.user_id,
        user_id,
        role = %grant.role,
        entity_id = ?grant.entity_id,
        "Role granted"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: grant })))
}

/// DELETE /admin/roles/{id}
pub async fn revoke_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !UserRoleRepo::delete(&state.pool, id).await? {
        return Err(CoreError::NotFound {
            entity: "UserRole",
            id,
        }
        .into());
    }

    tracing::info!(admin_id = admin.user_id, grant_id = id, "Role revoked");
    Ok(StatusCode::NO_CONTENT)
}
