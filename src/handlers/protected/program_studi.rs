// handlers/protected/program_studi.rs - /api/program-studi handlers (admin)

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Extension, Json, Path, Query,
};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::program_studi::{ProgramStudi, ProgramStudiInput};
use crate::handlers::params::{self, ListQuery};
use crate::middleware::{deleted, ApiResponse, ApiResult, TenantPool};
use crate::services::ProgramStudiService;

/// GET /api/program-studi
pub async fn list(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<ProgramStudi>> {
    let query = params::query(query)?;
    let rows = ProgramStudiService::new(pool).list(&query.params()).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/program-studi
pub async fn create(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    payload: Result<Json<ProgramStudiInput>, JsonRejection>,
) -> ApiResult<ProgramStudi> {
    let Json(input) = payload?;
    let row = ProgramStudiService::new(pool).create(input).await?;
    Ok(ApiResponse::created(row))
}

/// GET /api/program-studi/:id
pub async fn get(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<ProgramStudi> {
    let id = params::path_id(path)?;
    let row = ProgramStudiService::new(pool).get(id).await?;
    Ok(ApiResponse::success(row))
}

/// PUT /api/program-studi/:id
pub async fn update(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ProgramStudiInput>, JsonRejection>,
) -> ApiResult<ProgramStudi> {
    let id = params::path_id(path)?;
    let Json(input) = payload?;
    let row = ProgramStudiService::new(pool).update(id, input).await?;
    Ok(ApiResponse::success(row))
}

/// DELETE /api/program-studi/:id - Refused while users or curriculum rows remain
pub async fn delete(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    let id = params::path_id(path)?;
    ProgramStudiService::new(pool).delete(id).await?;
    Ok(ApiResponse::success(deleted(id)))
}
