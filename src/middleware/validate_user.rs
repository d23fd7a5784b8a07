use axum::{extract::Request, middleware::Next, response::Response};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::RoleSet;
use crate::database::manager::DatabaseManager;
use crate::database::models::user::User;
use crate::error::ApiError;

use super::auth::AuthUser;

/// Application pool, injected by middleware
#[derive(Clone)]
pub struct TenantPool(pub PgPool);

/// The caller as currently stored, not as remembered by the token
#[derive(Clone, Debug)]
pub struct ValidatedUser {
    pub id: Uuid,
    pub email: String,
    pub roles: RoleSet,
    pub program_studi_id: Option<Uuid>,
}

/// Middleware that re-checks the token's user against the users table.
/// Ensures the user exists, is active and still holds the roles in the token.
pub async fn validate_user_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(ApiError::unauthorized)?;

    let pool = DatabaseManager::pool().await?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(auth_user.user_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Database error validating user {}: {}", auth_user.user_id, e);
            ApiError::internal_server_error("Failed to validate user")
        })?;

    let Some(user) = user.filter(|u| u.is_active) else {
        tracing::warn!("User validation failed: {} not found or inactive", auth_user.user_id);
        return Err(ApiError::unauthorized());
    };

    let stored_roles = user.role_set();
    if stored_roles != auth_user.roles || user.program_studi_id != auth_user.program_studi_id {
        tracing::warn!("User validation failed: token for {} is stale", user.email);
        return Err(ApiError::unauthorized());
    }

    tracing::debug!("User validation successful: {} {:?}", user.email, stored_roles.to_strings());

    request.extensions_mut().insert(ValidatedUser {
        id: user.id,
        email: user.email,
        roles: stored_roles,
        program_studi_id: user.program_studi_id,
    });
    request.extensions_mut().insert(TenantPool(pool));

    Ok(next.run(request).await)
}
