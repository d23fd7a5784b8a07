use sqlx::{self, PgConnection};
use uuid::Uuid;

use crate::database::entity::{Dependent, TenantEntity};
use crate::database::manager::DatabaseError;
use crate::database::query_builder::{QueryBuilder, SqlParam};
use crate::types::TenantScope;

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub search: Option<String>,
    pub parent_id: Option<Uuid>,
    pub limit: i64,
    pub offset: Option<i64>,
}

/// Scoped access to one entity table over a borrowed connection, so the
/// same calls work on a pooled connection or inside a transaction.
pub struct Repository<'c, T> {
    conn: &'c mut PgConnection,
    _phantom: std::marker::PhantomData<T>,
}

impl<'c, T: TenantEntity> Repository<'c, T> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self {
            conn,
            _phantom: std::marker::PhantomData,
        }
    }

    fn scoped(scope: &TenantScope) -> QueryBuilder<T> {
        QueryBuilder::<T>::new(T::TABLE).scoped("program_studi_id", scope)
    }

    pub async fn select_page(&mut self, scope: &TenantScope, params: &ListParams) -> Result<Vec<T>, DatabaseError> {
        let mut builder = Self::scoped(scope).search(T::SEARCH_COLUMNS, params.search.as_deref());
        if let (Some(column), Some(parent_id)) = (T::PARENT_COLUMN, params.parent_id) {
            builder = builder.where_eq(column, SqlParam::Uuid(parent_id));
        }
        builder
            .order_by(T::ORDER_BY)
            .paginate(params.limit, params.offset)
            .select_all(&mut *self.conn)
            .await
    }

    pub async fn select_one(&mut self, scope: &TenantScope, id: Uuid) -> Result<Option<T>, DatabaseError> {
        Self::scoped(scope)
            .where_eq("id", SqlParam::Uuid(id))
            .select_optional(&mut *self.conn)
            .await
    }

    /// Out-of-scope ids are indistinguishable from missing ones
    pub async fn select_404(&mut self, scope: &TenantScope, id: Uuid) -> Result<T, DatabaseError> {
        self.select_one(scope, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", T::LABEL)))
    }

    /// Same as `select_404` but holds a row lock until the transaction ends
    pub async fn lock_404(&mut self, scope: &TenantScope, id: Uuid) -> Result<T, DatabaseError> {
        Self::scoped(scope)
            .where_eq("id", SqlParam::Uuid(id))
            .for_update()
            .select_optional(&mut *self.conn)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", T::LABEL)))
    }

    pub async fn code_taken(&mut self, tenant: Uuid, code: &str, exclude: Option<Uuid>) -> Result<bool, DatabaseError> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE \"{}\" = $1 AND program_studi_id = $2 AND ($3::uuid IS NULL OR id <> $3))",
            T::TABLE,
            T::CODE_COLUMN
        );
        let taken: bool = sqlx::query_scalar(&sql)
            .bind(code)
            .bind(tenant)
            .bind(exclude)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(taken)
    }

    /// First dependent table still pointing at the row, if any
    pub async fn first_dependent(&mut self, id: Uuid) -> Result<Option<&'static Dependent>, DatabaseError> {
        for dependent in T::DEPENDENTS {
            if references_exist(&mut *self.conn, dependent, id).await? {
                return Ok(Some(dependent));
            }
        }
        Ok(None)
    }

    pub async fn delete(&mut self, id: Uuid) -> Result<u64, DatabaseError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.conn).await?;
        Ok(result.rows_affected())
    }
}

pub async fn references_exist(conn: &mut PgConnection, dependent: &Dependent, id: Uuid) -> Result<bool, DatabaseError> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE \"{}\" = $1)",
        dependent.table, dependent.column
    );
    let exists: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(conn).await?;
    Ok(exists)
}

/// Program studi owning a row of any tenant table, if the row exists
pub async fn tenant_of(conn: &mut PgConnection, table: &'static str, id: Uuid) -> Result<Option<Uuid>, DatabaseError> {
    let sql = format!("SELECT program_studi_id FROM \"{}\" WHERE id = $1", table);
    let tenant: Option<Uuid> = sqlx::query_scalar(&sql).bind(id).fetch_optional(conn).await?;
    Ok(tenant)
}

/// Subset of `ids` that exist in `table` within the scope
pub async fn existing_ids(
    conn: &mut PgConnection,
    table: &'static str,
    ids: &[Uuid],
    scope: &TenantScope,
) -> Result<Vec<Uuid>, DatabaseError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!(
        "SELECT id FROM \"{}\" WHERE id = ANY($1) AND ($2::uuid IS NULL OR program_studi_id = $2)",
        table
    );
    let found: Vec<Uuid> = sqlx::query_scalar(&sql)
        .bind(ids)
        .bind(scope.tenant())
        .fetch_all(conn)
        .await?;
    Ok(found)
}
