use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::database::entity::{Dependent, TenantEntity, TenantSource};
use crate::validation::{optional_text, FieldErrors, CODE_LEN, NAME_LEN};

/// Graduate profile
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfilLulusan {
    pub id: Uuid,
    pub kode_pl: String,
    pub nama_profil: String,
    pub deskripsi: Option<String>,
    pub profesi: Vec<String>,
    pub program_studi_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfilLulusanInput {
    pub kode_pl: Option<String>,
    pub nama_profil: Option<String>,
    pub deskripsi: Option<String>,
    pub profesi: Option<Vec<String>>,
    #[serde(alias = "programStudiId")]
    pub program_studi_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct ProfilLulusanPayload {
    pub kode_pl: String,
    pub nama_profil: String,
    pub deskripsi: Option<String>,
    pub profesi: Vec<String>,
    pub program_studi_id: Option<Uuid>,
}

#[async_trait]
impl TenantEntity for ProfilLulusan {
    const TABLE: &'static str = "profil_lulusan";
    const LABEL: &'static str = "Profil Lulusan";
    const CODE_COLUMN: &'static str = "kode_pl";
    const CODE_LABEL: &'static str = "Kode PL";
    const ORDER_BY: &'static str = "kode_pl ASC";
    const SEARCH_COLUMNS: &'static [&'static str] = &["kode_pl", "nama_profil", "deskripsi"];
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("pl_cpl_mapping", "profil_lulusan_id", "CPL mappings"),
        Dependent::new("pl_mk_mapping", "profil_lulusan_id", "Mata Kuliah mappings"),
    ];

    type Input = ProfilLulusanInput;
    type Payload = ProfilLulusanPayload;

    fn id(&self) -> Uuid {
        self.id
    }

    fn program_studi_id(&self) -> Uuid {
        self.program_studi_id
    }

    fn validate(input: ProfilLulusanInput) -> Result<ProfilLulusanPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let kode_pl = errors.bounded_text("kode_pl", "Kode PL", input.kode_pl, CODE_LEN);
        let nama_profil = errors.bounded_text("nama_profil", "Nama profil", input.nama_profil, NAME_LEN);

        let (Some(kode_pl), Some(nama_profil)) = (kode_pl, nama_profil) else {
            return Err(errors);
        };

        let profesi = input
            .profesi
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(ProfilLulusanPayload {
            kode_pl,
            nama_profil,
            deskripsi: optional_text(input.deskripsi),
            profesi,
            program_studi_id: input.program_studi_id,
        })
    }

    fn code(payload: &ProfilLulusanPayload) -> &str {
        &payload.kode_pl
    }

    fn tenant_source(payload: &ProfilLulusanPayload) -> TenantSource {
        TenantSource::Requested(payload.program_studi_id)
    }

    async fn insert(conn: &mut PgConnection, tenant: Uuid, p: &ProfilLulusanPayload) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ProfilLulusan>(
            r#"
            INSERT INTO profil_lulusan (kode_pl, nama_profil, deskripsi, profesi, program_studi_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&p.kode_pl)
        .bind(&p.nama_profil)
        .bind(&p.deskripsi)
        .bind(&p.profesi)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }

    async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        tenant: Uuid,
        p: &ProfilLulusanPayload,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ProfilLulusan>(
            r#"
            UPDATE profil_lulusan
            SET kode_pl = $2, nama_profil = $3, deskripsi = $4, profesi = $5,
                program_studi_id = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&p.kode_pl)
        .bind(&p.nama_profil)
        .bind(&p.deskripsi)
        .bind(&p.profesi)
        .bind(tenant)
        .fetch_one(conn)
        .await
    }
}
