use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::database::entity::{Dependent, TenantEntity, TenantSource};
use crate::validation::{optional_text, FieldErrors, CODE_LEN, NAME_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "bahan_kajian_kategori", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BkKategori {
    WajibInformatika,
    Tambahan,
    WajibSnDikti,
    WajibUmum,
}

impl BkKategori {
    pub const NAMES: &'static [&'static str] = &["wajib_informatika", "tambahan", "wajib_sn_dikti", "wajib_umum"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "wajib_informatika" => Some(BkKategori::WajibInformatika),
            "tambahan" => Some(BkKategori::Tambahan),
            "wajib_sn_dikti" => Some(BkKategori::WajibSnDikti),
            "wajib_umum" => Some(BkKategori::WajibUmum),
            _ => None,
        }
    }
}

/// Subject matter / knowledge topic
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BahanKajian {
    pub id: Uuid,
    pub kode_bk: String,
    pub nama_bahan_kajian: String,
    pub kategori: BkKategori,
    pub bobot_min_sks: i32,
    pub bobot_max_sks: i32,
    pub deskripsi: Option<String>,
    pub program_studi_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BahanKajianInput {
    pub kode_bk: Option<String>,
    pub nama_bahan_kajian: Option<String>,
    pub kategori: Option<String>,
    pub bobot_min_sks: Option<i32>,
    pub bobot_max_sks: Option<i32>,
    pub deskripsi: Option<String>,
    #[serde(alias = "programStudiId")]
    pub program_studi_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct BahanKajianPayload {
    pub kode_bk: String,
    pub nama_bahan_kajian: String,
    pub kategori: BkKategori,
    pub bobot_min_sks: i32,
    pub bobot_max_sks: i32,
    pub deskripsi: Option<String>,
    pub program_studi_id: Option<Uuid>,
}

#[async_trait]
impl TenantEntity for BahanKajian {
    const TABLE: &'static str = "bahan_kajian";
    const LABEL: &'static str = "Bahan Kajian";
    const CODE_COLUMN: &'static str = "kode_bk";
    const CODE_LABEL: &'static str = "Kode BK";
    const ORDER_BY: &'static str = "kode_bk ASC";
    const SEARCH_COLUMNS: &'static [&'static str] = &["kode_bk", "nama_bahan_kajian"];
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("cpl_bk_mapping", "bahan_kajian_id", "CPL mappings"),
        Dependent::new("bk_mk_mapping", "bahan_kajian_id", "Mata Kuliah mappings"),
    ];

    type Input = BahanKajianInput;
    type Payload = BahanKajianPayload;

    fn id(&self) -> Uuid {
        self.id
    }

    fn program_studi_id(&self) -> Uuid {
        self.program_studi_id
    }

    fn validate(input: BahanKajianInput) -> Result<BahanKajianPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let kode_bk = errors.bounded_text("kode_bk", "Kode BK", input.kode_bk, CODE_LEN);
        let nama = errors.bounded_text("nama_bahan_kajian", "Nama bahan kajian", input.nama_bahan_kajian, NAME_LEN);
        let kategori = errors
            .required_text("kategori", "Kategori", input.kategori)
            .and_then(|k| {
                let parsed = BkKategori::parse(&k);
                if parsed.is_none() {
                    errors.one_of("kategori", "Kategori", &k, BkKategori::NAMES);
                }
                parsed
            });
        let min = errors.required("bobot_min_sks", "Bobot min SKS", input.bobot_min_sks);
        let max = errors.required("bobot_max_sks", "Bobot max SKS", input.bobot_max_sks);

        if let Some(min) = min {
            errors.int_range("bobot_min_sks", "Bobot min SKS", min, 0, None);
        }
        if let Some(max) = max {
            errors.int_range("bobot_max_sks", "Bobot max SKS", max, 1, None);
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                errors.add("bobot_min_sks", "Bobot min SKS cannot exceed bobot max SKS");
            }
        }

        let (Some(kode_bk), Some(nama_bahan_kajian), Some(kategori), Some(bobot_min_sks), Some(bobot_max_sks)) =
            (kode_bk, nama, kategori, min, max)
        else {
            return Err(errors);
        };
        errors.into_result()?;

        Ok(BahanKajianPayload {
            kode_bk,
            nama_bahan_kajian,
            kategori,
            bobot_min_sks,
            bobot_max_sks,
            deskripsi: optional_text(input.deskripsi),
            program_studi_id: input.program_studi_id,
        })
    }

    fn code(payload: &BahanKajianPayload) -> &str {
        &payload.kode_bk
    }

    fn tenant_source(payload: &BahanKajianPayload) -> TenantSource {
        TenantSource::Requested(payload.program_studi_id)
    }

    async fn insert(conn: &mut PgConnection, tenant: Uuid, p: &BahanKajianPayload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BahanKajian>(
            r#"
            INSERT INTO bahan_kajian
                (kode_bk, nama_bahan_kajian, kategori, bobot_min_sks, bobot_max_sks, deskripsi, program_studi_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&p.kode_bk)
        .bind(&p.nama_bahan_kajian)
        .bind(p.kategori)
        .bind(p.bobot_min_sks)
        .bind(p.bobot_max_sks)
        .bind(&p.deskripsi)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }

    async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        tenant: Uuid,
        p: &BahanKajianPayload,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BahanKajian>(
            r#"
            UPDATE bahan_kajian
            SET kode_bk = $2, nama_bahan_kajian = $3, kategori = $4, bobot_min_sks = $5,
                bobot_max_sks = $6, deskripsi = $7, program_studi_id = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&p.kode_bk)
        .bind(&p.nama_bahan_kajian)
        .bind(p.kategori)
        .bind(p.bobot_min_sks)
        .bind(p.bobot_max_sks)
        .bind(&p.deskripsi)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> BahanKajianInput {
        BahanKajianInput {
            kode_bk: Some("BK-01".into()),
            nama_bahan_kajian: Some("Rekayasa Perangkat Lunak".into()),
            kategori: Some("wajib_sn_dikti".into()),
            bobot_min_sks: Some(2),
            bobot_max_sks: Some(6),
            ..Default::default()
        }
    }

    #[test]
    fn parses_kategori() {
        let payload = BahanKajian::validate(input()).unwrap();
        assert_eq!(payload.kategori, BkKategori::WajibSnDikti);
        assert_eq!(serde_json::to_string(&payload.kategori).unwrap(), "\"wajib_sn_dikti\"");
    }

    #[test]
    fn min_cannot_exceed_max() {
        let mut bad = input();
        bad.bobot_min_sks = Some(8);
        let errors = BahanKajian::validate(bad).unwrap_err();
        assert!(errors.get("bobot_min_sks").is_some());
    }

    #[test]
    fn unknown_kategori_lists_choices() {
        let mut bad = input();
        bad.kategori = Some("pilihan".into());
        let errors = BahanKajian::validate(bad).unwrap_err();
        assert!(errors.get("kategori").unwrap_or_default().contains("wajib_umum"));
    }
}
