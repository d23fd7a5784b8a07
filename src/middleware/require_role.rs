use axum::{extract::Request, middleware::Next, response::Response};

use crate::auth::Area;
use crate::error::ApiError;

use super::auth::AuthUser;

/// Decided from the token alone so a denied caller never reaches the database
async fn require_area(area: Area, request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request.extensions().get::<AuthUser>().ok_or_else(ApiError::unauthorized)?;

    if !auth_user.roles.allows(area) {
        tracing::warn!(
            user_id = %auth_user.user_id,
            area = ?area,
            "Role gate denied request to {}",
            request.uri().path()
        );
        return Err(ApiError::forbidden());
    }

    Ok(next.run(request).await)
}

/// PL, CPL, CPMK, MK, BK, Kurikulum, mappings and roles: admin or prodi
pub async fn require_curriculum_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    require_area(Area::Curriculum, request, next).await
}

/// Program studi and user management: admin only
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    require_area(Area::Administration, request, next).await
}
