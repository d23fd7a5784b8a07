use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::database::entity::{Dependent, TenantEntity, TenantSource};
use crate::validation::{optional_text, FieldErrors, CODE_LEN, NAME_LEN};

pub const JENIS: &[&str] = &["wajib", "pilihan"];

/// Course
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MataKuliah {
    pub id: Uuid,
    pub kode_mk: String,
    pub nama_mk: String,
    pub sks: i32,
    pub semester: i32,
    pub jenis: String,
    pub konsentrasi: Option<String>,
    pub deskripsi: Option<String>,
    pub program_studi_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MataKuliahInput {
    pub kode_mk: Option<String>,
    pub nama_mk: Option<String>,
    pub sks: Option<i32>,
    pub semester: Option<i32>,
    pub jenis: Option<String>,
    pub konsentrasi: Option<String>,
    pub deskripsi: Option<String>,
    #[serde(alias = "programStudiId")]
    pub program_studi_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct MataKuliahPayload {
    pub kode_mk: String,
    pub nama_mk: String,
    pub sks: i32,
    pub semester: i32,
    pub jenis: String,
    pub konsentrasi: Option<String>,
    pub deskripsi: Option<String>,
    pub program_studi_id: Option<Uuid>,
}

#[async_trait]
impl TenantEntity for MataKuliah {
    const TABLE: &'static str = "mata_kuliah";
    const LABEL: &'static str = "Mata Kuliah";
    const CODE_COLUMN: &'static str = "kode_mk";
    const CODE_LABEL: &'static str = "Kode MK";
    const ORDER_BY: &'static str = "semester ASC, kode_mk ASC";
    const SEARCH_COLUMNS: &'static [&'static str] = &["kode_mk", "nama_mk"];
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("cpmk", "mata_kuliah_id", "CPMK"),
        Dependent::new("bk_mk_mapping", "mata_kuliah_id", "Bahan Kajian mappings"),
        Dependent::new("kurikulum_mk_mapping", "mata_kuliah_id", "Kurikulum mappings"),
        Dependent::new("pl_mk_mapping", "mata_kuliah_id", "Profil Lulusan mappings"),
        Dependent::new("cpl_mk_mapping", "mata_kuliah_id", "CPL mappings"),
    ];

    type Input = MataKuliahInput;
    type Payload = MataKuliahPayload;

    fn id(&self) -> Uuid {
        self.id
    }

    fn program_studi_id(&self) -> Uuid {
        self.program_studi_id
    }

    fn validate(input: MataKuliahInput) -> Result<MataKuliahPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let kode_mk = errors.bounded_text("kode_mk", "Kode MK", input.kode_mk, CODE_LEN);
        let nama_mk = errors.bounded_text("nama_mk", "Nama MK", input.nama_mk, NAME_LEN);
        let sks = errors.required("sks", "SKS", input.sks);
        let semester = errors.required("semester", "Semester", input.semester);
        let jenis = errors.required_text("jenis", "Jenis", input.jenis);

        if let Some(sks) = sks {
            errors.int_range("sks", "SKS", sks, 1, None);
        }
        if let Some(semester) = semester {
            errors.int_range("semester", "Semester", semester, 1, Some(8));
        }
        if let Some(jenis) = &jenis {
            errors.one_of("jenis", "Jenis", jenis, JENIS);
        }

        let konsentrasi = optional_text(input.konsentrasi);
        if let Some(k) = &konsentrasi {
            errors.max_len("konsentrasi", "Konsentrasi", k, CODE_LEN);
        }

        let (Some(kode_mk), Some(nama_mk), Some(sks), Some(semester), Some(jenis)) =
            (kode_mk, nama_mk, sks, semester, jenis)
        else {
            return Err(errors);
        };
        errors.into_result()?;

        Ok(MataKuliahPayload {
            kode_mk,
            nama_mk,
            sks,
            semester,
            jenis,
            konsentrasi,
            deskripsi: optional_text(input.deskripsi),
            program_studi_id: input.program_studi_id,
        })
    }

    fn code(payload: &MataKuliahPayload) -> &str {
        &payload.kode_mk
    }

    fn tenant_source(payload: &MataKuliahPayload) -> TenantSource {
        TenantSource::Requested(payload.program_studi_id)
    }

    async fn insert(conn: &mut PgConnection, tenant: Uuid, p: &MataKuliahPayload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, MataKuliah>(
            r#"
            INSERT INTO mata_kuliah (kode_mk, nama_mk, sks, semester, jenis, konsentrasi, deskripsi, program_studi_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&p.kode_mk)
        .bind(&p.nama_mk)
        .bind(p.sks)
        .bind(p.semester)
        .bind(&p.jenis)
        .bind(&p.konsentrasi)
        .bind(&p.deskripsi)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }

    async fn update(conn: &mut PgConnection, id: Uuid, tenant: Uuid, p: &MataKuliahPayload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, MataKuliah>(
            r#"
            UPDATE mata_kuliah
            SET kode_mk = $2, nama_mk = $3, sks = $4, semester = $5, jenis = $6,
                konsentrasi = $7, deskripsi = $8, program_studi_id = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&p.kode_mk)
        .bind(&p.nama_mk)
        .bind(p.sks)
        .bind(p.semester)
        .bind(&p.jenis)
        .bind(&p.konsentrasi)
        .bind(&p.deskripsi)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> MataKuliahInput {
        MataKuliahInput {
            kode_mk: Some("IF101".into()),
            nama_mk: Some("Algoritma".into()),
            sks: Some(3),
            semester: Some(1),
            jenis: Some("wajib".into()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_course() {
        let payload = MataKuliah::validate(input()).unwrap();
        assert_eq!(payload.sks, 3);
        assert_eq!(MataKuliah::code(&payload), "IF101");
    }

    #[test]
    fn semester_and_sks_bounds() {
        let mut bad = input();
        bad.semester = Some(9);
        bad.sks = Some(0);
        let errors = MataKuliah::validate(bad).unwrap_err();
        assert_eq!(errors.get("semester"), Some("Semester must be at most 8"));
        assert_eq!(errors.get("sks"), Some("SKS must be at least 1"));
    }

    #[test]
    fn jenis_must_be_known() {
        let mut bad = input();
        bad.jenis = Some("bebas".into());
        assert!(MataKuliah::validate(bad).unwrap_err().get("jenis").is_some());
    }
}
