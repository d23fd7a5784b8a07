use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgRow, FromRow, PgConnection};
use uuid::Uuid;

use crate::validation::FieldErrors;

/// A table whose rows block deletion of the owner while any reference them
#[derive(Debug, Clone, Copy)]
pub struct Dependent {
    pub table: &'static str,
    pub column: &'static str,
    pub label: &'static str,
}

impl Dependent {
    pub const fn new(table: &'static str, column: &'static str, label: &'static str) -> Self {
        Self { table, column, label }
    }
}

/// Where a new or updated row takes its program studi from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantSource {
    /// Explicit `program_studi_id` in the body, honoured for unscoped callers
    Requested(Option<Uuid>),
    /// Inherited from a parent row (CPMK from its mata kuliah)
    Parent {
        table: &'static str,
        field: &'static str,
        label: &'static str,
        id: Uuid,
    },
}

/// A curriculum row owned by one program studi with a tenant-unique code
#[async_trait]
pub trait TenantEntity: for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    /// Human label used in messages ("CPL", "Mata Kuliah")
    const LABEL: &'static str;
    const CODE_COLUMN: &'static str;
    const CODE_LABEL: &'static str;
    /// Raw ORDER BY expression
    const ORDER_BY: &'static str;
    const SEARCH_COLUMNS: &'static [&'static str];
    const DEPENDENTS: &'static [Dependent];
    /// Column filtered by the `mata_kuliah_id` list parameter, if any
    const PARENT_COLUMN: Option<&'static str> = None;

    type Input: DeserializeOwned + Send + 'static;
    type Payload: Send + Sync + 'static;

    fn id(&self) -> Uuid;
    fn program_studi_id(&self) -> Uuid;

    fn validate(input: Self::Input) -> Result<Self::Payload, FieldErrors>;
    fn code(payload: &Self::Payload) -> &str;
    fn tenant_source(payload: &Self::Payload) -> TenantSource;

    async fn insert(conn: &mut PgConnection, tenant: Uuid, payload: &Self::Payload) -> Result<Self, sqlx::Error>;

    async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        tenant: Uuid,
        payload: &Self::Payload,
    ) -> Result<Self, sqlx::Error>;
}
