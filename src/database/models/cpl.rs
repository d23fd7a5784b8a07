use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::database::entity::{Dependent, TenantEntity, TenantSource};
use crate::validation::{optional_text, FieldErrors, CODE_LEN};

pub const KATEGORI: &[&str] = &["sikap", "pengetahuan", "keterampilan_umum", "keterampilan_khusus"];
pub const SUMBER: &[&str] = &["SN_DIKTI", "KKNI", "IABEE"];

/// Capaian Pembelajaran Lulusan
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cpl {
    pub id: Uuid,
    pub kode_cpl: String,
    pub deskripsi: Option<String>,
    pub kategori: String,
    pub sumber: String,
    pub nilai_minimum_kelulusan: Option<Decimal>,
    pub program_studi_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CplInput {
    pub kode_cpl: Option<String>,
    pub deskripsi: Option<String>,
    pub kategori: Option<String>,
    pub sumber: Option<String>,
    pub nilai_minimum_kelulusan: Option<Decimal>,
    #[serde(alias = "programStudiId")]
    pub program_studi_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CplPayload {
    pub kode_cpl: String,
    pub deskripsi: Option<String>,
    pub kategori: String,
    pub sumber: String,
    pub nilai_minimum_kelulusan: Option<Decimal>,
    pub program_studi_id: Option<Uuid>,
}

#[async_trait]
impl TenantEntity for Cpl {
    const TABLE: &'static str = "cpl";
    const LABEL: &'static str = "CPL";
    const CODE_COLUMN: &'static str = "kode_cpl";
    const CODE_LABEL: &'static str = "Kode CPL";
    const ORDER_BY: &'static str = "kode_cpl ASC";
    const SEARCH_COLUMNS: &'static [&'static str] = &["kode_cpl", "deskripsi"];
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("cpmk_cpl_mapping", "cpl_id", "CPMK mappings"),
        Dependent::new("pl_cpl_mapping", "cpl_id", "Profil Lulusan mappings"),
        Dependent::new("cpl_bk_mapping", "cpl_id", "Bahan Kajian mappings"),
        Dependent::new("kurikulum_cpl_mapping", "cpl_id", "Kurikulum mappings"),
        Dependent::new("cpl_mk_mapping", "cpl_id", "Mata Kuliah mappings"),
    ];

    type Input = CplInput;
    type Payload = CplPayload;

    fn id(&self) -> Uuid {
        self.id
    }

    fn program_studi_id(&self) -> Uuid {
        self.program_studi_id
    }

    fn validate(input: CplInput) -> Result<CplPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let kode_cpl = errors.bounded_text("kode_cpl", "Kode CPL", input.kode_cpl, CODE_LEN);
        let kategori = errors.required_text("kategori", "Kategori", input.kategori);
        let sumber = errors.required_text("sumber", "Sumber", input.sumber);

        if let Some(k) = &kategori {
            errors.one_of("kategori", "Kategori", k, KATEGORI);
        }
        if let Some(s) = &sumber {
            errors.one_of("sumber", "Sumber", s, SUMBER);
        }
        if let Some(nilai) = input.nilai_minimum_kelulusan {
            errors.decimal_range("nilai_minimum_kelulusan", "Nilai minimum kelulusan", nilai, Decimal::ZERO, Decimal::from(4));
        }

        let (Some(kode_cpl), Some(kategori), Some(sumber)) = (kode_cpl, kategori, sumber) else {
            return Err(errors);
        };
        errors.into_result()?;

        Ok(CplPayload {
            kode_cpl,
            deskripsi: optional_text(input.deskripsi),
            kategori,
            sumber,
            nilai_minimum_kelulusan: input.nilai_minimum_kelulusan,
            program_studi_id: input.program_studi_id,
        })
    }

    fn code(payload: &CplPayload) -> &str {
        &payload.kode_cpl
    }

    fn tenant_source(payload: &CplPayload) -> TenantSource {
        TenantSource::Requested(payload.program_studi_id)
    }

    async fn insert(conn: &mut PgConnection, tenant: Uuid, p: &CplPayload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Cpl>(
            r#"
            INSERT INTO cpl (kode_cpl, deskripsi, kategori, sumber, nilai_minimum_kelulusan, program_studi_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&p.kode_cpl)
        .bind(&p.deskripsi)
        .bind(&p.kategori)
        .bind(&p.sumber)
        .bind(p.nilai_minimum_kelulusan)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }

    async fn update(conn: &mut PgConnection, id: Uuid, tenant: Uuid, p: &CplPayload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Cpl>(
            r#"
            UPDATE cpl
            SET kode_cpl = $2, deskripsi = $3, kategori = $4, sumber = $5,
                nilai_minimum_kelulusan = $6, program_studi_id = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&p.kode_cpl)
        .bind(&p.deskripsi)
        .bind(&p.kategori)
        .bind(&p.sumber)
        .bind(p.nilai_minimum_kelulusan)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_missing_field() {
        let errors = Cpl::validate(CplInput::default()).unwrap_err();
        assert_eq!(errors.get("kode_cpl"), Some("Kode CPL is required"));
        assert!(errors.get("kategori").is_some());
        assert!(errors.get("sumber").is_some());
    }

    #[test]
    fn rejects_unknown_kategori_and_sumber() {
        let input = CplInput {
            kode_cpl: Some("CPL-01".into()),
            kategori: Some("hobi".into()),
            sumber: Some("LAINNYA".into()),
            ..Default::default()
        };
        let errors = Cpl::validate(input).unwrap_err();
        assert!(errors.get("kategori").is_some());
        assert!(errors.get("sumber").is_some());
        assert!(errors.get("kode_cpl").is_none());
    }

    #[test]
    fn accepts_a_complete_input() {
        let input = CplInput {
            kode_cpl: Some(" CPL-01 ".into()),
            deskripsi: Some("".into()),
            kategori: Some("sikap".into()),
            sumber: Some("SN_DIKTI".into()),
            nilai_minimum_kelulusan: Some(Decimal::new(275, 2)),
            program_studi_id: None,
        };
        let payload = Cpl::validate(input).unwrap();
        assert_eq!(Cpl::code(&payload), "CPL-01");
        assert_eq!(payload.deskripsi, None);
        assert_eq!(Cpl::tenant_source(&payload), TenantSource::Requested(None));
    }
}
