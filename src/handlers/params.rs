// handlers/params.rs - extractor rejections mapped onto ApiError

use axum::extract::{
    rejection::{PathRejection, QueryRejection},
    Path, Query,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::config;
use crate::database::repository::ListParams;
use crate::error::ApiError;

pub fn path_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id).map_err(|_| ApiError::bad_request("Invalid id"))
}

pub fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(q)| q)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// `?search=&program_studi_id=&mata_kuliah_id=&limit=&offset=`
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub program_studi_id: Option<Uuid>,
    pub mata_kuliah_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    pub fn params(&self) -> ListParams {
        ListParams {
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            parent_id: self.mata_kuliah_id,
            limit: config().api.list_limit(self.limit),
            offset: self.offset.filter(|o| *o > 0),
        }
    }
}
