//! Grant-based access extractors.
//!
//! Roles live in the `user_roles` table, not in the token, so these
//! extractors hit the database on every request. A revoked grant stops
//! working on the next call.

use arbor_core::error::CoreError;
use arbor_core::permissions::get_direct_permissions;
use arbor_core::roles::AccessLevel;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the unrestricted admin grant. Rejects with 403 Forbidden
/// otherwise; an admin grant scoped to one entity does not qualify.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(user): RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let direct =
            get_direct_permissions(&mut state.reader(), user.actor(), AccessLevel::Admin).await?;
        if !direct.is_admin {
            tracing::warn!(user_id = user.user_id, "Admin access denied");
            return Err(AppError::Core(CoreError::Forbidden(
                "Unrestricted admin grant required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}
