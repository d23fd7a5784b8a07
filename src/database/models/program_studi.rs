use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::entity::Dependent;
use crate::validation::{optional_text, FieldErrors, JENJANG_LEN, NAME_LEN, SHORT_LEN};

/// Academic department; the tenant every curriculum row belongs to
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgramStudi {
    pub id: Uuid,
    pub kode_program_studi: String,
    pub nama_program_studi: String,
    pub jenjang: String,
    pub fakultas: String,
    pub status_aktif: bool,
    pub deskripsi: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProgramStudiInput {
    pub kode_program_studi: Option<String>,
    pub nama_program_studi: Option<String>,
    pub jenjang: Option<String>,
    pub fakultas: Option<String>,
    pub status_aktif: Option<bool>,
    pub deskripsi: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProgramStudiPayload {
    pub kode_program_studi: String,
    pub nama_program_studi: String,
    pub jenjang: String,
    pub fakultas: String,
    pub status_aktif: bool,
    pub deskripsi: Option<String>,
}

impl ProgramStudi {
    pub const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("users", "program_studi_id", "users"),
        Dependent::new("kurikulum", "program_studi_id", "kurikulum"),
        Dependent::new("profil_lulusan", "program_studi_id", "profil lulusan"),
        Dependent::new("cpl", "program_studi_id", "CPL"),
        Dependent::new("mata_kuliah", "program_studi_id", "mata kuliah"),
        Dependent::new("cpmk", "program_studi_id", "CPMK"),
        Dependent::new("bahan_kajian", "program_studi_id", "bahan kajian"),
    ];

    pub fn validate(input: ProgramStudiInput) -> Result<ProgramStudiPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let kode = errors.bounded_text("kode_program_studi", "Kode program studi", input.kode_program_studi, SHORT_LEN);
        let nama = errors.bounded_text("nama_program_studi", "Nama program studi", input.nama_program_studi, NAME_LEN);
        let jenjang = errors.bounded_text("jenjang", "Jenjang", input.jenjang, JENJANG_LEN);
        let fakultas = errors.bounded_text("fakultas", "Fakultas", input.fakultas, NAME_LEN);

        let (Some(kode_program_studi), Some(nama_program_studi), Some(jenjang), Some(fakultas)) =
            (kode, nama, jenjang, fakultas)
        else {
            return Err(errors);
        };

        Ok(ProgramStudiPayload {
            kode_program_studi,
            nama_program_studi,
            jenjang,
            fakultas,
            status_aktif: input.status_aktif.unwrap_or(true),
            deskripsi: optional_text(input.deskripsi),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_identity_fields() {
        let errors = ProgramStudi::validate(ProgramStudiInput {
            kode_program_studi: Some("IF".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(errors.get("kode_program_studi").is_none());
        assert!(errors.get("nama_program_studi").is_some());
        assert!(errors.get("fakultas").is_some());
    }
}
