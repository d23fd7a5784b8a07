// handlers/protected/catalog.rs - CRUD for tenant-owned curriculum entities
//
// One generic handler set, instantiated per entity in the router:
//   GET    /api/cpl          -> list::<Cpl>
//   POST   /api/cpl          -> create::<Cpl>
//   GET    /api/cpl/:id      -> get::<Cpl>
//   PUT    /api/cpl/:id      -> update::<Cpl>
//   DELETE /api/cpl/:id      -> delete::<Cpl>

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Extension, Json, Path, Query,
};
use serde_json::Value;
use uuid::Uuid;

use crate::database::entity::TenantEntity;
use crate::handlers::params::{self, ListQuery};
use crate::middleware::{deleted, ApiResponse, ApiResult, TenantPool, ValidatedUser};
use crate::services::CatalogService;
use crate::types::TenantScope;

/// GET /api/<entity> - Scoped, searchable, paginated list
///
/// `program_studi_id` narrows the list only for callers that see every
/// program studi; `mata_kuliah_id` filters CPMK by course.
pub async fn list<T: TenantEntity>(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<T>> {
    let query = params::query(query)?;
    let scope = scope.narrowed(query.program_studi_id);
    let rows = CatalogService::<T>::new(pool, scope).list(&query.params()).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/<entity> - Validate, resolve tenant, check code, insert
pub async fn create<T: TenantEntity>(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    Extension(user): Extension<ValidatedUser>,
    payload: Result<Json<T::Input>, JsonRejection>,
) -> ApiResult<T> {
    let Json(input) = payload?;
    let row = CatalogService::<T>::new(pool, scope)
        .create(input, user.program_studi_id)
        .await?;
    Ok(ApiResponse::created(row))
}

/// GET /api/<entity>/:id
pub async fn get<T: TenantEntity>(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<T> {
    let id = params::path_id(path)?;
    let row = CatalogService::<T>::new(pool, scope).get(id).await?;
    Ok(ApiResponse::success(row))
}

/// PUT /api/<entity>/:id - Full replacement of the row's fields
pub async fn update<T: TenantEntity>(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<T::Input>, JsonRejection>,
) -> ApiResult<T> {
    let id = params::path_id(path)?;
    let Json(input) = payload?;
    let row = CatalogService::<T>::new(pool, scope).update(id, input).await?;
    Ok(ApiResponse::success(row))
}

/// DELETE /api/<entity>/:id - Refused while still referenced
pub async fn delete<T: TenantEntity>(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    let id = params::path_id(path)?;
    CatalogService::<T>::new(pool, scope).delete(id).await?;
    Ok(ApiResponse::success(deleted(id)))
}
