//! Handlers for the entity hierarchy.
//!
//! Every request recomputes the caller's effective permissions from the
//! current grants and tree. Mutations open the write transaction first and
//! resolve permissions through it, so the permission check, the lifecycle
//! validation and the write all run under the structural lock. They commit
//! only if every step succeeds.

use arbor_core::entity::{Entity, EntityVersion};
use arbor_core::error::CoreError;
use arbor_core::hierarchy::{HierarchyStore, RoleStore};
use arbor_core::lifecycle::{CreateEntity, UpdateEntity};
use arbor_core::permissions::{effective_permissions, EffectivePermissions};
use arbor_core::roles::AccessLevel;
use arbor_core::tree::visible_tree;
use arbor_core::types::DbId;
use arbor_db::repositories::{EntityRepo, EntityVersionRepo};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Effective permissions resolved through `store`. Mutations pass their
/// write transaction so the check and the write see the same tree.
async fn permissions_for<S: HierarchyStore + RoleStore>(
    store: &mut S,
    state: &AppState,
    auth: AuthUser,
    level: AccessLevel,
) -> AppResult<EffectivePermissions> {
    let perms = effective_permissions(store, auth.actor(), level, state.hierarchy()).await?;
    tracing::debug!(
        user_id = auth.user_id,
        %level,
        scope = ?perms.scoped_len(),
        "Resolved effective permissions"
    );
    Ok(perms)
}

/// Require `level` on `id`, logging denials.
///
/// Runs before any existence lookup: a caller without access gets 403 for
/// missing and existing IDs alike, so IDs outside their scope cannot be
/// probed.
async fn authorize_entity<S: HierarchyStore + RoleStore>(
    store: &mut S,
    state: &AppState,
    auth: AuthUser,
    level: AccessLevel,
    id: DbId,
) -> AppResult<EffectivePermissions> {
    let perms = permissions_for(store, state, auth, level).await?;
    perms.ensure_id(id).inspect_err(|_| {
        tracing::warn!(user_id = auth.user_id, entity_id = id, %level, "Entity access denied");
    })?;
    Ok(perms)
}

fn authorize_parent(
    perms: &EffectivePermissions,
    auth: AuthUser,
    parent_id: Option<DbId>,
) -> Result<(), CoreError> {
    perms.ensure_parent_ids(&[parent_id]).inspect_err(|_| {
        tracing::warn!(user_id = auth.user_id, ?parent_id, "Parent access denied");
    })
}

async fn find_entity(state: &AppState, id: DbId) -> AppResult<Entity> {
    let row = EntityRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Entity",
            id,
        })?;
    Ok(Entity::try_from(row)?)
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// GET /entities/tree
///
/// The forest of entities the caller may read.
pub async fn get_tree(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let tree = visible_tree(&mut state.reader(), auth.actor(), state.hierarchy()).await?;
    Ok(Json(DataResponse { data: tree }))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /entities
///
/// Requires write access on the parent; creating a root requires the
/// unrestricted admin grant.
pub async fn create_entity(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateEntity>,
) -> AppResult<impl IntoResponse> {
    let mut tx = state.writer().await?;
    let perms = permissions_for(&mut tx, &state, auth, AccessLevel::Write).await?;
    authorize_parent(&perms, auth, input.parent_id)?;

    let entity = state.lifecycle().create(&mut tx, auth.actor(), &input).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = auth.user_id,
        entity_id = entity.id,
        entity_type = %entity.entity_type,
        "Entity created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: entity })))
}

/// GET /entities/{id}
pub async fn get_entity(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    authorize_entity(&mut state.reader(), &state, auth, AccessLevel::Read, id).await?;
    let entity = find_entity(&state, id).await?;
    Ok(Json(DataResponse { data: entity }))
}

/// PUT /entities/{id}
///
/// Requires write access on the entity and, when moving it, on the new
/// parent.
pub async fn update_entity(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateEntity>,
) -> AppResult<impl IntoResponse> {
    let mut tx = state.writer().await?;
    let perms = authorize_entity(&mut tx, &state, auth, AccessLevel::Write, id).await?;
    if let Some(new_parent) = input.parent_id {
        authorize_parent(&perms, auth, new_parent)?;
    }

    let entity = state.lifecycle().update(&mut tx, auth.actor(), id, &input).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = auth.user_id,
        entity_id = id,
        moved = input.parent_changed(),
        current_version = ?entity.state.current_version(),
        "Entity updated"
    );

    Ok(Json(DataResponse { data: entity }))
}

/// DELETE /entities/{id}
///
/// Soft-deletes the entity and its subtree. Returns the removed IDs.
pub async fn delete_entity(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let mut tx = state.writer().await?;
    authorize_entity(&mut tx, &state, auth, AccessLevel::Write, id).await?;

    let outcome = state.lifecycle().delete(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = auth.user_id,
        entity_id = id,
        deleted = outcome.deleted_ids.len(),
        "Entity subtree deleted"
    );

    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// GET /entities/{id}/versions
///
/// Version history, oldest first. Empty for entities that were never
/// published.
pub async fn list_versions(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    authorize_entity(&mut state.reader(), &state, auth, AccessLevel::Read, id).await?;
    find_entity(&state, id).await?;

    let versions: Vec<EntityVersion> = EntityVersionRepo::list_by_entity(&state.pool, id)
        .await?
        .into_iter()
        .map(EntityVersion::from)
        .collect();
    Ok(Json(DataResponse { data: versions }))
}

/// GET /entities/{id}/versions/{version}
pub async fn get_version(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, version)): Path<(DbId, i32)>,
) -> AppResult<impl IntoResponse> {
    if version < 1 {
        return Err(AppError::BadRequest(format!(
            "Version must be at least 1, got {version}"
        )));
    }
    authorize_entity(&mut state.reader(), &state, auth, AccessLevel::Read, id).await?;
    find_entity(&state, id).await?;

    let row = EntityVersionRepo::find_by_entity_and_version(&state.pool, id, version)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "EntityVersion",
            id: DbId::from(version),
        })?;
    Ok(Json(DataResponse {
        data: EntityVersion::from(row),
    }))
}
