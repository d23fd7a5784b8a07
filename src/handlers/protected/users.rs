// handlers/protected/users.rs - /api/users handlers (admin)

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Extension, Json, Path, Query,
};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::user::{CreateUserInput, UpdateUserInput, UserView};
use crate::handlers::params::{self, ListQuery};
use crate::middleware::{deleted, ApiResponse, ApiResult, TenantPool, ValidatedUser};
use crate::services::UserService;

/// GET /api/users?search=
pub async fn list(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<UserView>> {
    let query = params::query(query)?;
    let users = UserService::new(pool).list(&query.params()).await?;
    Ok(ApiResponse::success(users))
}

/// POST /api/users
pub async fn create(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    payload: Result<Json<CreateUserInput>, JsonRejection>,
) -> ApiResult<UserView> {
    let Json(input) = payload?;
    let user = UserService::new(pool).create(input).await?;
    Ok(ApiResponse::created(user))
}

/// GET /api/users/:id
pub async fn get(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<UserView> {
    let id = params::path_id(path)?;
    let user = UserService::new(pool).get(id).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/users/:id - Partial update; a new password is re-hashed
pub async fn update(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserInput>, JsonRejection>,
) -> ApiResult<UserView> {
    let id = params::path_id(path)?;
    let Json(input) = payload?;
    let user = UserService::new(pool).update(id, input).await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /api/users/:id - An admin cannot delete their own account
pub async fn delete(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(caller): Extension<ValidatedUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    let id = params::path_id(path)?;
    UserService::new(pool).delete(id, caller.id).await?;
    Ok(ApiResponse::success(deleted(id)))
}
