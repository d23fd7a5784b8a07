// handlers/protected/mapping.rs - /api/mapping/<pair> handlers
//
// Generic over the link table; the router instantiates one set per pair:
//   GET    /api/mapping/pl-cpl?profil_lulusan_id=   -> list::<PlCpl>
//   POST   /api/mapping/pl-cpl                      -> create::<PlCpl>
//   PUT    /api/mapping/pl-cpl                      -> replace::<PlCpl>
//   DELETE /api/mapping/pl-cpl/:id                  -> delete::<PlCpl>

use std::collections::HashMap;

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Extension, Json, Path, Query,
};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::mapping::MappingPair;
use crate::error::ApiError;
use crate::handlers::params;
use crate::middleware::{deleted, ApiResponse, ApiResult, TenantPool};
use crate::services::mapping_service::{parse_command, parse_replace, MappingCommand};
use crate::services::{MappingService, ServiceError};
use crate::types::TenantScope;

/// GET /api/mapping/<pair> - Scoped links, optionally for one anchor
pub async fn list<P: MappingPair>(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> ApiResult<Vec<Value>> {
    let table = P::TABLE;
    let query = params::query(query)?;
    let anchor = match query.get(table.anchor.fk) {
        Some(raw) => Some(
            Uuid::parse_str(raw).map_err(|_| ApiError::field_error(table.anchor.fk, "Must be a valid id"))?,
        ),
        None => None,
    };

    let links = MappingService::new(pool, scope).list(&table, anchor).await?;
    Ok(ApiResponse::success(links.iter().map(|link| link.to_json(&table)).collect()))
}

/// POST /api/mapping/<pair> - Replace-Set for a list body, one link otherwise
pub async fn create<P: MappingPair>(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let table = P::TABLE;
    let Json(body) = payload?;
    let service = MappingService::new(pool, scope);

    match parse_command(&table, &body).map_err(ServiceError::Validation)? {
        MappingCommand::Single { anchor, related } => {
            let link = service.create_one(&table, anchor, related).await?;
            Ok(ApiResponse::created(link.to_json(&table)))
        }
        MappingCommand::Replace { anchor, related } => {
            let links = service.replace(&table, anchor, &related).await?;
            let out = links.iter().map(|link| link.to_json(&table)).collect();
            Ok(ApiResponse::success(Value::Array(out)))
        }
    }
}

/// PUT /api/mapping/<pair> - Replace-Set; an empty list clears the anchor
pub async fn replace<P: MappingPair>(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Vec<Value>> {
    let table = P::TABLE;
    let Json(body) = payload?;
    let (anchor, related) = parse_replace(&table, &body).map_err(ServiceError::Validation)?;

    let links = MappingService::new(pool, scope).replace(&table, anchor, &related).await?;
    Ok(ApiResponse::success(links.iter().map(|link| link.to_json(&table)).collect()))
}

/// DELETE /api/mapping/<pair>/:id - Remove one link
pub async fn delete<P: MappingPair>(
    Extension(TenantPool(pool)): Extension<TenantPool>,
    Extension(scope): Extension<TenantScope>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    let id = params::path_id(path)?;
    MappingService::new(pool, scope).delete_one(&P::TABLE, id).await?;
    Ok(ApiResponse::success(deleted(id)))
}
