use std::marker::PhantomData;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::database::entity::{TenantEntity, TenantSource};
use crate::database::manager::ConstraintViolation;
use crate::database::repository::{tenant_of, ListParams, Repository};
use crate::services::ServiceError;
use crate::types::TenantScope;

/// CRUD for one curriculum entity inside the caller's tenant scope
pub struct CatalogService<T> {
    pool: PgPool,
    scope: TenantScope,
    _entity: PhantomData<T>,
}

impl<T: TenantEntity> CatalogService<T> {
    pub fn new(pool: PgPool, scope: TenantScope) -> Self {
        Self {
            pool,
            scope,
            _entity: PhantomData,
        }
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<T>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let rows = Repository::<T>::new(&mut conn).select_page(&self.scope, params).await?;
        Ok(rows)
    }

    pub async fn get(&self, id: Uuid) -> Result<T, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let row = Repository::<T>::new(&mut conn).select_404(&self.scope, id).await?;
        Ok(row)
    }

    /// `default_tenant` is used when an unscoped caller names no program studi
    pub async fn create(&self, input: T::Input, default_tenant: Option<Uuid>) -> Result<T, ServiceError> {
        let payload = T::validate(input)?;

        let mut tx = self.pool.begin().await?;
        let tenant = resolve_tenant(&mut tx, &self.scope, T::tenant_source(&payload), default_tenant).await?;

        if Repository::<T>::new(&mut tx).code_taken(tenant, T::code(&payload), None).await? {
            return Err(duplicate::<T>());
        }

        let row = T::insert(&mut tx, tenant, &payload)
            .await
            .map_err(unique_as_duplicate::<T>)?;
        tx.commit().await?;

        tracing::info!(table = T::TABLE, id = %row.id(), program_studi_id = %tenant, "created");
        Ok(row)
    }

    /// Full replacement of the row's fields. The row stays in its program studi.
    pub async fn update(&self, id: Uuid, input: T::Input) -> Result<T, ServiceError> {
        let payload = T::validate(input)?;

        let mut tx = self.pool.begin().await?;
        let existing = Repository::<T>::new(&mut tx).lock_404(&self.scope, id).await?;
        let tenant = retain_tenant(&mut tx, &self.scope, T::tenant_source(&payload), existing.program_studi_id()).await?;

        if Repository::<T>::new(&mut tx).code_taken(tenant, T::code(&payload), Some(id)).await? {
            return Err(duplicate::<T>());
        }

        let row = T::update(&mut tx, id, tenant, &payload)
            .await
            .map_err(unique_as_duplicate::<T>)?;
        tx.commit().await?;

        tracing::info!(table = T::TABLE, id = %id, "updated");
        Ok(row)
    }

    /// Refused while any mapping or child row still references the entity
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        let mut repo = Repository::<T>::new(&mut tx);
        repo.lock_404(&self.scope, id).await?;

        if let Some(dependent) = repo.first_dependent(id).await? {
            return Err(ServiceError::InUse(format!(
                "Cannot delete {} that is being used in {}",
                T::LABEL,
                dependent.label
            )));
        }

        repo.delete(id).await?;
        tx.commit().await?;

        tracing::info!(table = T::TABLE, id = %id, "deleted");
        Ok(())
    }
}

fn duplicate<T: TenantEntity>() -> ServiceError {
    ServiceError::Duplicate {
        field: T::CODE_COLUMN.to_string(),
        message: format!("{} already exists for this program studi", T::CODE_LABEL),
    }
}

/// A concurrent insert can still trip the unique index after the pre-check
fn unique_as_duplicate<T: TenantEntity>(err: sqlx::Error) -> ServiceError {
    match ConstraintViolation::classify(&err) {
        Some(ConstraintViolation::Unique(_)) => duplicate::<T>(),
        _ => err.into(),
    }
}

/// An update may not move a row to another program studi, neither by
/// naming one nor by re-parenting onto a row of another program studi.
pub async fn retain_tenant(
    conn: &mut PgConnection,
    scope: &TenantScope,
    source: TenantSource,
    current: Uuid,
) -> Result<Uuid, ServiceError> {
    match source {
        // A fixed scope ignores the requested id, as on create
        TenantSource::Requested(_) if scope.tenant().is_some() => Ok(current),
        TenantSource::Requested(requested) => same_tenant(requested, current, "program_studi_id", "Program studi"),
        TenantSource::Parent { field, label, .. } => {
            let parent = resolve_tenant(conn, scope, source, None).await?;
            same_tenant(Some(parent), current, field, label)
        }
    }
}

fn same_tenant(requested: Option<Uuid>, current: Uuid, field: &str, label: &str) -> Result<Uuid, ServiceError> {
    match requested {
        Some(id) if id != current => Err(ServiceError::field(
            field,
            format!("{} must belong to the same program studi", label),
        )),
        _ => Ok(current),
    }
}

/// Pick the program studi a written row belongs to.
///
/// A fixed scope always writes into its own program studi. An unscoped
/// caller uses the requested id, then `fallback`, and the id must exist.
/// Child rows inherit the tenant of their parent, which must be visible.
pub async fn resolve_tenant(
    conn: &mut PgConnection,
    scope: &TenantScope,
    source: TenantSource,
    fallback: Option<Uuid>,
) -> Result<Uuid, ServiceError> {
    match source {
        TenantSource::Requested(requested) => {
            if let TenantScope::ProgramStudi(own) = scope {
                return Ok(*own);
            }
            let Some(id) = requested.or(fallback) else {
                return Err(ServiceError::field("program_studi_id", "Program studi is required"));
            };
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM program_studi WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
            if !exists {
                return Err(ServiceError::field("program_studi_id", "Program studi not found"));
            }
            Ok(id)
        }
        TenantSource::Parent { table, field, label, id } => match tenant_of(conn, table, id).await? {
            Some(tenant) if scope.includes(tenant) => Ok(tenant),
            _ => Err(ServiceError::field(field, format!("{} not found", label))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_keeps_the_current_program_studi() {
        let current = Uuid::new_v4();
        assert_eq!(same_tenant(None, current, "program_studi_id", "Program studi").unwrap(), current);
        assert_eq!(same_tenant(Some(current), current, "program_studi_id", "Program studi").unwrap(), current);
    }

    #[test]
    fn update_rejects_another_program_studi() {
        let err = same_tenant(Some(Uuid::new_v4()), Uuid::new_v4(), "mata_kuliah_id", "Mata kuliah").unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected a field error");
        };
        assert_eq!(errors.get("mata_kuliah_id"), Some("Mata kuliah must belong to the same program studi"));
    }
}
