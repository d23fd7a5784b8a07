use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{validate_jwt, Claims, RoleSet};
use crate::config;
use crate::error::ApiError;

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub roles: RoleSet,
    pub permissions: Vec<String>,
    pub program_studi_id: Option<Uuid>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            roles: claims.roles,
            permissions: claims.permissions,
            program_studi_id: claims.program_studi_id,
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let token = extract_token(&headers).map_err(|reason| {
        tracing::warn!("Authentication rejected: {}", reason);
        ApiError::unauthorized()
    })?;

    let claims = validate_jwt(&token).map_err(|e| {
        tracing::warn!("Authentication rejected: {}", e);
        ApiError::unauthorized()
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

/// Bearer header first, then the session cookie
pub fn extract_token(headers: &HeaderMap) -> Result<String, &'static str> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| "Invalid Authorization header format")?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or("Authorization header must use Bearer token format")?
            .trim();
        if token.is_empty() {
            return Err("Empty JWT token");
        }
        return Ok(token.to_string());
    }

    let cookie_name = &config::config().security.session_cookie_name;
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
        .ok_or("Missing Authorization header or session cookie")
}
