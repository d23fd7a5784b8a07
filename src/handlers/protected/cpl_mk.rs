// handlers/protected/cpl_mk.rs - /api/mapping/cpl-mk handlers

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Extension, Json, Path, Query,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::mapping::CplMkMapping;
use crate::handlers::params;
use crate::middleware::{deleted, ApiResponse, ApiResult, TenantPool};
use crate::services::cpl_mk_service::{parse_body, parse_replace_body, CplMkAttributesInput, CplMkBody, CplMkCommand};
use crate::services::{CplMkService, ServiceError};
use crate::types::TenantScope;

#[derive(Debug, Default, Deserialize)]
pub struct CplMkQuery {
    pub cpl_id: Option<Uuid>,
    pub mata_kuliah_id: Option<Uuid>,
}

/// GET /api/mapping/cpl-mk?cpl_id=&mata_kuliah_id=
pub async fn list(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    query: Result<Query<CplMkQuery>, QueryRejection>,
) -> ApiResult<Vec<CplMkMapping>> {
    let query = params::query(query)?;
    let rows = CplMkService::new(pool, scope)
        .list(query.cpl_id, query.mata_kuliah_id)
        .await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/mapping/cpl-mk - One link, or a `mata_kuliah_mappings` set
pub async fn create(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    payload: Result<Json<CplMkBody>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = payload?;
    let service = CplMkService::new(pool, scope);

    match parse_body(body).map_err(ServiceError::Validation)? {
        CplMkCommand::Single { cpl_id, entry } => {
            let row = service.create_one(cpl_id, &entry).await?;
            Ok(ApiResponse::created(json!(row)))
        }
        CplMkCommand::Replace { cpl_id, entries } => {
            let rows = service.replace(cpl_id, &entries).await?;
            Ok(ApiResponse::success(json!(rows)))
        }
    }
}

/// PUT /api/mapping/cpl-mk - Replace the CPL's course links; `[]` clears them
pub async fn replace(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    payload: Result<Json<CplMkBody>, JsonRejection>,
) -> ApiResult<Vec<CplMkMapping>> {
    let Json(body) = payload?;
    let (cpl_id, entries) = parse_replace_body(body).map_err(ServiceError::Validation)?;
    let rows = CplMkService::new(pool, scope).replace(cpl_id, &entries).await?;
    Ok(ApiResponse::success(rows))
}

/// PUT /api/mapping/cpl-mk/:id - Update status, semester target or weight
pub async fn update(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CplMkAttributesInput>, JsonRejection>,
) -> ApiResult<CplMkMapping> {
    let id = params::path_id(path)?;
    let Json(input) = payload?;
    let row = CplMkService::new(pool, scope).update_attributes(id, input).await?;
    Ok(ApiResponse::success(row))
}

/// DELETE /api/mapping/cpl-mk/:id
pub async fn delete(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    let id = params::path_id(path)?;
    CplMkService::new(pool, scope).delete_one(id).await?;
    Ok(ApiResponse::success(deleted(id)))
}
