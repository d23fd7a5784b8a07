use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::ConstraintViolation;
use crate::database::models::program_studi::{ProgramStudi, ProgramStudiInput, ProgramStudiPayload};
use crate::database::query_builder::{QueryBuilder, SqlParam};
use crate::database::repository::{references_exist, ListParams};
use crate::services::ServiceError;

/// Registry of program studi, the tenants of the system
pub struct ProgramStudiService {
    pool: PgPool,
}

fn duplicate() -> ServiceError {
    ServiceError::Duplicate {
        field: "kode_program_studi".to_string(),
        message: "Kode program studi already exists".to_string(),
    }
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Program studi not found".to_string())
}

impl ProgramStudiService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<ProgramStudi>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let rows = QueryBuilder::<ProgramStudi>::new("program_studi")
            .search(&["kode_program_studi", "nama_program_studi", "fakultas"], params.search.as_deref())
            .order_by("kode_program_studi ASC")
            .paginate(params.limit, params.offset)
            .select_all(&mut conn)
            .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: Uuid) -> Result<ProgramStudi, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        QueryBuilder::<ProgramStudi>::new("program_studi")
            .where_eq("id", SqlParam::Uuid(id))
            .select_optional(&mut conn)
            .await?
            .ok_or_else(not_found)
    }

    async fn code_taken(&self, kode: &str, exclude: Option<Uuid>) -> Result<bool, ServiceError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM program_studi WHERE kode_program_studi = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(kode)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    pub async fn create(&self, input: ProgramStudiInput) -> Result<ProgramStudi, ServiceError> {
        let p = ProgramStudi::validate(input)?;
        if self.code_taken(&p.kode_program_studi, None).await? {
            return Err(duplicate());
        }

        let row = sqlx::query_as::<_, ProgramStudi>(
            r#"
            INSERT INTO program_studi (kode_program_studi, nama_program_studi, jenjang, fakultas, status_aktif, deskripsi)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&p.kode_program_studi)
        .bind(&p.nama_program_studi)
        .bind(&p.jenjang)
        .bind(&p.fakultas)
        .bind(p.status_aktif)
        .bind(&p.deskripsi)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_as_duplicate)?;

        tracing::info!(id = %row.id, kode = %row.kode_program_studi, "program studi created");
        Ok(row)
    }

    pub async fn update(&self, id: Uuid, input: ProgramStudiInput) -> Result<ProgramStudi, ServiceError> {
        let p: ProgramStudiPayload = ProgramStudi::validate(input)?;
        if self.code_taken(&p.kode_program_studi, Some(id)).await? {
            return Err(duplicate());
        }

        let row = sqlx::query_as::<_, ProgramStudi>(
            r#"
            UPDATE program_studi
            SET kode_program_studi = $2, nama_program_studi = $3, jenjang = $4, fakultas = $5,
                status_aktif = $6, deskripsi = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&p.kode_program_studi)
        .bind(&p.nama_program_studi)
        .bind(&p.jenjang)
        .bind(&p.fakultas)
        .bind(p.status_aktif)
        .bind(&p.deskripsi)
        .fetch_optional(&self.pool)
        .await
        .map_err(unique_as_duplicate)?
        .ok_or_else(not_found)?;

        tracing::info!(id = %id, "program studi updated");
        Ok(row)
    }

    /// Refused while any user or curriculum row belongs to the program studi
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM program_studi WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(not_found());
        }

        for dependent in ProgramStudi::DEPENDENTS {
            if references_exist(&mut tx, dependent, id).await? {
                return Err(ServiceError::InUse(format!(
                    "Cannot delete Program Studi that is being used in {}",
                    dependent.label
                )));
            }
        }

        sqlx::query("DELETE FROM program_studi WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(id = %id, "program studi deleted");
        Ok(())
    }
}

fn unique_as_duplicate(err: sqlx::Error) -> ServiceError {
    match ConstraintViolation::classify(&err) {
        Some(ConstraintViolation::Unique(_)) => duplicate(),
        _ => err.into(),
    }
}
