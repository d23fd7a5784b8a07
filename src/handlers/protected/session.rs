// handlers/protected/session.rs - GET /api/auth/whoami, POST /api/auth/refresh

use axum::{extract::Extension, http::header, response::IntoResponse};
use serde::Serialize;

use crate::database::models::user::UserView;
use crate::error::ApiError;
use crate::handlers::public::login::{issue_token, session_cookie};
use crate::middleware::{ApiResponse, ApiResult, TenantPool, ValidatedUser};
use crate::services::UserService;
use crate::types::TenantScope;

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user: UserView,
    /// Absent for roles that work outside any program studi
    pub scope: Option<TenantScope>,
}

/// GET /api/auth/whoami - The caller's stored account and tenant scope
pub async fn whoami_get(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(user): Extension<ValidatedUser>,
) -> ApiResult<WhoAmI> {
    let view = UserService::new(pool).get(user.id).await?;
    let scope = TenantScope::resolve(&view.roles, view.program_studi_id);
    Ok(ApiResponse::success(WhoAmI { user: view, scope }))
}

/// POST /api/auth/refresh - Exchange a valid token for a fresh one
pub async fn refresh_post(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(user): Extension<ValidatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    let stored = UserService::new(pool)
        .find(user.id)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    let response = issue_token(stored)?;
    let cookie = session_cookie(&response.token);
    tracing::debug!(user_id = %user.id, "Token refreshed");

    Ok(([(header::SET_COOKIE, cookie)], ApiResponse::success(response)))
}
