// handlers/public/login.rs - POST /auth/login handler

use axum::{
    extract::rejection::JsonRejection,
    http::header,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

use crate::auth::{generate_jwt, Claims};
use crate::config::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::user::{User, UserView};
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::services::{ServiceError, UserService};
use crate::validation::FieldErrors;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: UserView,
}

/// Sign a token for the stored user and describe it
pub fn issue_token(user: User) -> Result<TokenResponse, ApiError> {
    let claims = Claims::new(user.id, user.email.clone(), user.role_set(), user.program_studi_id);
    let token = generate_jwt(&claims).map_err(|e| {
        tracing::error!("Token generation failed: {}", e);
        ApiError::internal_server_error("An error occurred while processing your request")
    })?;
    Ok(TokenResponse {
        token,
        expires_at: claims.exp,
        user: user.into(),
    })
}

/// `Set-Cookie` value carrying the token for browser clients
pub fn session_cookie(token: &str) -> String {
    let security = &config().security;
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        security.session_cookie_name,
        token,
        security.jwt_expiry_hours * 3600
    )
}

/// POST /auth/login - Authenticate with email and password and receive a JWT
///
/// Unknown email, inactive account and wrong password all answer 401.
pub async fn login_post(payload: Result<Json<LoginRequest>, JsonRejection>) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;

    let mut errors = FieldErrors::new();
    let email = errors.required_text("email", "Email", request.email);
    let password = errors.required("password", "Password", request.password.filter(|p| !p.is_empty()));
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ServiceError::Validation(errors).into());
    };

    let pool = DatabaseManager::pool().await?;
    let user = UserService::new(pool).authenticate(&email, &password).await?.ok_or_else(|| {
        tracing::warn!("Login failed for {}", email);
        ApiError::unauthorized()
    })?;

    tracing::info!(user_id = %user.id, "Login succeeded");
    let response = issue_token(user)?;
    let cookie = session_cookie(&response.token);

    Ok(([(header::SET_COOKIE, cookie)], ApiResponse::success(response)))
}
