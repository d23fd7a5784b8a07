use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::database::entity::{Dependent, TenantEntity, TenantSource};
use crate::validation::{optional_text, FieldErrors, CODE_LEN, JENJANG_LEN, NAME_LEN, SHORT_LEN};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Kurikulum {
    pub id: Uuid,
    pub kode_kurikulum: String,
    pub nama_kurikulum: String,
    pub tahun_akademik: String,
    pub jurusan: String,
    pub jenjang: String,
    pub status_aktif: bool,
    pub deskripsi: Option<String>,
    pub program_studi_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KurikulumInput {
    pub kode_kurikulum: Option<String>,
    pub nama_kurikulum: Option<String>,
    pub tahun_akademik: Option<String>,
    pub jurusan: Option<String>,
    pub jenjang: Option<String>,
    pub status_aktif: Option<bool>,
    pub deskripsi: Option<String>,
    #[serde(alias = "programStudiId")]
    pub program_studi_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct KurikulumPayload {
    pub kode_kurikulum: String,
    pub nama_kurikulum: String,
    pub tahun_akademik: String,
    pub jurusan: String,
    pub jenjang: String,
    pub status_aktif: bool,
    pub deskripsi: Option<String>,
    pub program_studi_id: Option<Uuid>,
}

#[async_trait]
impl TenantEntity for Kurikulum {
    const TABLE: &'static str = "kurikulum";
    const LABEL: &'static str = "Kurikulum";
    const CODE_COLUMN: &'static str = "kode_kurikulum";
    const CODE_LABEL: &'static str = "Kode kurikulum";
    const ORDER_BY: &'static str = "tahun_akademik DESC, kode_kurikulum ASC";
    const SEARCH_COLUMNS: &'static [&'static str] = &["kode_kurikulum", "nama_kurikulum", "tahun_akademik"];
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("kurikulum_cpl_mapping", "kurikulum_id", "CPL mappings"),
        Dependent::new("kurikulum_mk_mapping", "kurikulum_id", "Mata Kuliah mappings"),
    ];

    type Input = KurikulumInput;
    type Payload = KurikulumPayload;

    fn id(&self) -> Uuid {
        self.id
    }

    fn program_studi_id(&self) -> Uuid {
        self.program_studi_id
    }

    fn validate(input: KurikulumInput) -> Result<KurikulumPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let kode = errors.bounded_text("kode_kurikulum", "Kode kurikulum", input.kode_kurikulum, CODE_LEN);
        let nama = errors.bounded_text("nama_kurikulum", "Nama kurikulum", input.nama_kurikulum, NAME_LEN);
        let tahun = errors.bounded_text("tahun_akademik", "Tahun akademik", input.tahun_akademik, SHORT_LEN);
        let jurusan = errors.bounded_text("jurusan", "Jurusan", input.jurusan, NAME_LEN);
        let jenjang = errors.bounded_text("jenjang", "Jenjang", input.jenjang, JENJANG_LEN);

        let (Some(kode_kurikulum), Some(nama_kurikulum), Some(tahun_akademik), Some(jurusan), Some(jenjang)) =
            (kode, nama, tahun, jurusan, jenjang)
        else {
            return Err(errors);
        };

        Ok(KurikulumPayload {
            kode_kurikulum,
            nama_kurikulum,
            tahun_akademik,
            jurusan,
            jenjang,
            status_aktif: input.status_aktif.unwrap_or(true),
            deskripsi: optional_text(input.deskripsi),
            program_studi_id: input.program_studi_id,
        })
    }

    fn code(payload: &KurikulumPayload) -> &str {
        &payload.kode_kurikulum
    }

    fn tenant_source(payload: &KurikulumPayload) -> TenantSource {
        TenantSource::Requested(payload.program_studi_id)
    }

    async fn insert(conn: &mut PgConnection, tenant: Uuid, p: &KurikulumPayload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Kurikulum>(
            r#"
            INSERT INTO kurikulum
                (kode_kurikulum, nama_kurikulum, tahun_akademik, jurusan, jenjang, status_aktif, deskripsi, program_studi_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&p.kode_kurikulum)
        .bind(&p.nama_kurikulum)
        .bind(&p.tahun_akademik)
        .bind(&p.jurusan)
        .bind(&p.jenjang)
        .bind(p.status_aktif)
        .bind(&p.deskripsi)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }

    async fn update(conn: &mut PgConnection, id: Uuid, tenant: Uuid, p: &KurikulumPayload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Kurikulum>(
            r#"
            UPDATE kurikulum
            SET kode_kurikulum = $2, nama_kurikulum = $3, tahun_akademik = $4, jurusan = $5,
                jenjang = $6, status_aktif = $7, deskripsi = $8, program_studi_id = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&p.kode_kurikulum)
        .bind(&p.nama_kurikulum)
        .bind(&p.tahun_akademik)
        .bind(&p.jurusan)
        .bind(&p.jenjang)
        .bind(p.status_aktif)
        .bind(&p.deskripsi)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_active() {
        let input = KurikulumInput {
            kode_kurikulum: Some("K2024".into()),
            nama_kurikulum: Some("Kurikulum OBE 2024".into()),
            tahun_akademik: Some("2024/2025".into()),
            jurusan: Some("Informatika".into()),
            jenjang: Some("S1".into()),
            ..Default::default()
        };
        let payload = Kurikulum::validate(input).unwrap();
        assert!(payload.status_aktif);
    }

    #[test]
    fn missing_fields_are_listed() {
        let errors = Kurikulum::validate(KurikulumInput::default()).unwrap_err().into_inner();
        assert_eq!(errors.len(), 5);
    }
}
