use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::ApiError;
use crate::services::ServiceError;
use crate::types::TenantScope;

use super::validate_user::ValidatedUser;

/// Middleware that resolves which program studi the caller works in.
/// A prodi user is bound to its own program studi, an admin sees all.
pub async fn validate_tenant_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<ValidatedUser>()
        .cloned()
        .ok_or_else(ApiError::unauthorized)?;

    let scope = TenantScope::resolve(&user.roles, user.program_studi_id).ok_or_else(|| {
        tracing::warn!("No program studi scope for {}", user.email);
        ApiError::from(ServiceError::NoProgramStudi)
    })?;

    tracing::debug!("Tenant scope for {}: {:?}", user.email, scope);
    request.extensions_mut().insert(scope);

    Ok(next.run(request).await)
}
