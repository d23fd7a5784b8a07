use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::database::entity::{Dependent, TenantEntity, TenantSource};
use crate::validation::{optional_text, FieldErrors, CODE_LEN};

/// Capaian Pembelajaran Mata Kuliah. `program_studi_id` always mirrors
/// the owning course.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cpmk {
    pub id: Uuid,
    pub mata_kuliah_id: Uuid,
    pub kode_cpmk: String,
    pub deskripsi: Option<String>,
    pub bobot_persen: Decimal,
    pub urutan: i32,
    pub program_studi_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CpmkInput {
    pub mata_kuliah_id: Option<Uuid>,
    pub kode_cpmk: Option<String>,
    pub deskripsi: Option<String>,
    pub bobot_persen: Option<Decimal>,
    pub urutan: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct CpmkPayload {
    pub mata_kuliah_id: Uuid,
    pub kode_cpmk: String,
    pub deskripsi: Option<String>,
    pub bobot_persen: Decimal,
    pub urutan: i32,
}

#[async_trait]
impl TenantEntity for Cpmk {
    const TABLE: &'static str = "cpmk";
    const LABEL: &'static str = "CPMK";
    const CODE_COLUMN: &'static str = "kode_cpmk";
    const CODE_LABEL: &'static str = "Kode CPMK";
    const ORDER_BY: &'static str =
        "(SELECT mk.kode_mk FROM mata_kuliah mk WHERE mk.id = cpmk.mata_kuliah_id) ASC, urutan ASC";
    const SEARCH_COLUMNS: &'static [&'static str] = &["kode_cpmk", "deskripsi"];
    const DEPENDENTS: &'static [Dependent] = &[Dependent::new("cpmk_cpl_mapping", "cpmk_id", "CPL mappings")];
    const PARENT_COLUMN: Option<&'static str> = Some("mata_kuliah_id");

    type Input = CpmkInput;
    type Payload = CpmkPayload;

    fn id(&self) -> Uuid {
        self.id
    }

    fn program_studi_id(&self) -> Uuid {
        self.program_studi_id
    }

    fn validate(input: CpmkInput) -> Result<CpmkPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mata_kuliah_id = errors.required("mata_kuliah_id", "Mata kuliah", input.mata_kuliah_id);
        let kode_cpmk = errors.bounded_text("kode_cpmk", "Kode CPMK", input.kode_cpmk, CODE_LEN);
        let bobot_persen = errors.required("bobot_persen", "Bobot persen", input.bobot_persen);
        let urutan = errors.required("urutan", "Urutan", input.urutan);

        if let Some(bobot) = bobot_persen {
            errors.decimal_range("bobot_persen", "Bobot persen", bobot, Decimal::ZERO, Decimal::ONE_HUNDRED);
        }
        if let Some(urutan) = urutan {
            errors.int_range("urutan", "Urutan", urutan, 1, None);
        }

        let (Some(mata_kuliah_id), Some(kode_cpmk), Some(bobot_persen), Some(urutan)) =
            (mata_kuliah_id, kode_cpmk, bobot_persen, urutan)
        else {
            return Err(errors);
        };
        errors.into_result()?;

        Ok(CpmkPayload {
            mata_kuliah_id,
            kode_cpmk,
            deskripsi: optional_text(input.deskripsi),
            bobot_persen,
            urutan,
        })
    }

    fn code(payload: &CpmkPayload) -> &str {
        &payload.kode_cpmk
    }

    fn tenant_source(payload: &CpmkPayload) -> TenantSource {
        TenantSource::Parent {
            table: "mata_kuliah",
            field: "mata_kuliah_id",
            label: "Mata kuliah",
            id: payload.mata_kuliah_id,
        }
    }

    async fn insert(conn: &mut PgConnection, tenant: Uuid, p: &CpmkPayload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Cpmk>(
            r#"
            INSERT INTO cpmk (mata_kuliah_id, kode_cpmk, deskripsi, bobot_persen, urutan, program_studi_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(p.mata_kuliah_id)
        .bind(&p.kode_cpmk)
        .bind(&p.deskripsi)
        .bind(p.bobot_persen)
        .bind(p.urutan)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }

    async fn update(conn: &mut PgConnection, id: Uuid, tenant: Uuid, p: &CpmkPayload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Cpmk>(
            r#"
            UPDATE cpmk
            SET mata_kuliah_id = $2, kode_cpmk = $3, deskripsi = $4, bobot_persen = $5,
                urutan = $6, program_studi_id = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(p.mata_kuliah_id)
        .bind(&p.kode_cpmk)
        .bind(&p.deskripsi)
        .bind(p.bobot_persen)
        .bind(p.urutan)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_comes_from_the_course() {
        let mk = Uuid::new_v4();
        let input = CpmkInput {
            mata_kuliah_id: Some(mk),
            kode_cpmk: Some("CPMK-011".into()),
            bobot_persen: Some(Decimal::from(40)),
            urutan: Some(1),
            ..Default::default()
        };
        let payload = Cpmk::validate(input).unwrap();
        assert!(matches!(Cpmk::tenant_source(&payload), TenantSource::Parent { id, .. } if id == mk));
    }

    #[test]
    fn weight_over_hundred_is_rejected() {
        let input = CpmkInput {
            mata_kuliah_id: Some(Uuid::new_v4()),
            kode_cpmk: Some("CPMK-011".into()),
            bobot_persen: Some(Decimal::from(120)),
            urutan: Some(0),
            ..Default::default()
        };
        let errors = Cpmk::validate(input).unwrap_err();
        assert!(errors.get("bobot_persen").is_some());
        assert!(errors.get("urutan").is_some());
    }
}
