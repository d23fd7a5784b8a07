use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

/// One side of a link table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub table: &'static str,
    /// Foreign key column in the link table, also the JSON field name
    pub fk: &'static str,
    /// JSON key of the embedded summary object
    pub key: &'static str,
    /// JSON field carrying the id list on replace
    pub ids_field: &'static str,
    pub code_column: &'static str,
    pub name_column: &'static str,
    pub label: &'static str,
}

pub const PROFIL_LULUSAN: Endpoint = Endpoint {
    table: "profil_lulusan",
    fk: "profil_lulusan_id",
    key: "profil_lulusan",
    ids_field: "profil_lulusan_ids",
    code_column: "kode_pl",
    name_column: "nama_profil",
    label: "Profil Lulusan",
};

pub const CPL: Endpoint = Endpoint {
    table: "cpl",
    fk: "cpl_id",
    key: "cpl",
    ids_field: "cpl_ids",
    code_column: "kode_cpl",
    name_column: "deskripsi",
    label: "CPL",
};

pub const CPMK: Endpoint = Endpoint {
    table: "cpmk",
    fk: "cpmk_id",
    key: "cpmk",
    ids_field: "cpmk_ids",
    code_column: "kode_cpmk",
    name_column: "deskripsi",
    label: "CPMK",
};

pub const BAHAN_KAJIAN: Endpoint = Endpoint {
    table: "bahan_kajian",
    fk: "bahan_kajian_id",
    key: "bahan_kajian",
    ids_field: "bahan_kajian_ids",
    code_column: "kode_bk",
    name_column: "nama_bahan_kajian",
    label: "Bahan Kajian",
};

pub const MATA_KULIAH: Endpoint = Endpoint {
    table: "mata_kuliah",
    fk: "mata_kuliah_id",
    key: "mata_kuliah",
    ids_field: "mata_kuliah_ids",
    code_column: "kode_mk",
    name_column: "nama_mk",
    label: "Mata Kuliah",
};

pub const KURIKULUM: Endpoint = Endpoint {
    table: "kurikulum",
    fk: "kurikulum_id",
    key: "kurikulum",
    ids_field: "kurikulum_ids",
    code_column: "kode_kurikulum",
    name_column: "nama_kurikulum",
    label: "Kurikulum",
};

/// How Replace-Set rewrites the rows of one anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceStrategy {
    /// Delete every row of the anchor, insert the whole set
    FullReplace,
    /// Delete only dropped pairs, insert only new ones; kept rows are untouched
    Differential,
}

#[derive(Debug, Clone, Copy)]
pub struct MappingTable {
    pub slug: &'static str,
    pub table: &'static str,
    pub anchor: Endpoint,
    pub related: Endpoint,
    pub strategy: ReplaceStrategy,
    /// Percentage column spread evenly (100 / n) across a replaced set
    pub weight_column: Option<&'static str>,
}

/// Compile-time selector for one link table, used to instantiate the
/// generic mapping handlers per route
pub trait MappingPair: Send + Sync + 'static {
    const TABLE: MappingTable;
}

macro_rules! mapping_pair {
    ($name:ident, $slug:literal, $table:literal, $anchor:expr, $related:expr, $strategy:expr, $weight:expr) => {
        pub struct $name;

        impl MappingPair for $name {
            const TABLE: MappingTable = MappingTable {
                slug: $slug,
                table: $table,
                anchor: $anchor,
                related: $related,
                strategy: $strategy,
                weight_column: $weight,
            };
        }
    };
}

mapping_pair!(PlCpl, "pl-cpl", "pl_cpl_mapping", PROFIL_LULUSAN, CPL, ReplaceStrategy::Differential, None);
mapping_pair!(CplCpmk, "cpl-cpmk", "cpmk_cpl_mapping", CPL, CPMK, ReplaceStrategy::FullReplace, Some("kontribusi_persen"));
mapping_pair!(CplBk, "cpl-bk", "cpl_bk_mapping", CPL, BAHAN_KAJIAN, ReplaceStrategy::FullReplace, None);
mapping_pair!(BkMk, "bk-mk", "bk_mk_mapping", BAHAN_KAJIAN, MATA_KULIAH, ReplaceStrategy::FullReplace, None);
mapping_pair!(KurikulumCpl, "kurikulum-cpl", "kurikulum_cpl_mapping", KURIKULUM, CPL, ReplaceStrategy::Differential, None);
mapping_pair!(KurikulumMk, "kurikulum-mk", "kurikulum_mk_mapping", KURIKULUM, MATA_KULIAH, ReplaceStrategy::FullReplace, None);
mapping_pair!(PlMk, "pl-mk", "pl_mk_mapping", PROFIL_LULUSAN, MATA_KULIAH, ReplaceStrategy::FullReplace, None);

/// A link row joined with the codes and names of both ends
#[derive(Debug, Clone, FromRow)]
pub struct MappingLink {
    pub id: Uuid,
    pub anchor_id: Uuid,
    pub anchor_kode: String,
    pub related_id: Uuid,
    pub related_kode: String,
    pub related_nama: Option<String>,
    pub weight: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl MappingLink {
    pub fn to_json(&self, table: &MappingTable) -> Value {
        let mut out = json!({
            "id": self.id,
            table.anchor.fk: self.anchor_id,
            table.related.fk: self.related_id,
            table.anchor.key: { "id": self.anchor_id, "kode": self.anchor_kode },
            table.related.key: {
                "id": self.related_id,
                "kode": self.related_kode,
                "nama": self.related_nama,
            },
            "created_at": self.created_at,
        });
        if let (Some(column), Some(weight)) = (table.weight_column, self.weight) {
            out[column] = json!(weight);
        }
        out
    }
}

/// Introduced / Reinforced / Mastered / Assessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cpl_mk_status")]
pub enum CplMkStatus {
    I,
    R,
    M,
    A,
}

impl CplMkStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "I" => Some(CplMkStatus::I),
            "R" => Some(CplMkStatus::R),
            "M" => Some(CplMkStatus::M),
            "A" => Some(CplMkStatus::A),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CplMkMapping {
    pub id: Uuid,
    pub cpl_id: Uuid,
    pub mata_kuliah_id: Uuid,
    pub status: CplMkStatus,
    pub semester_target: Option<i32>,
    pub bobot_status: Decimal,
    pub kode_cpl: String,
    pub kode_mk: String,
    pub nama_mk: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_descriptors() {
        assert_eq!(PlCpl::TABLE.strategy, ReplaceStrategy::Differential);
        assert_eq!(KurikulumCpl::TABLE.strategy, ReplaceStrategy::Differential);
        assert_eq!(CplCpmk::TABLE.table, "cpmk_cpl_mapping");
        assert_eq!(CplCpmk::TABLE.weight_column, Some("kontribusi_persen"));
        assert_eq!(BkMk::TABLE.related.ids_field, "mata_kuliah_ids");
    }

    #[test]
    fn link_json_uses_column_names() {
        let link = MappingLink {
            id: Uuid::new_v4(),
            anchor_id: Uuid::new_v4(),
            anchor_kode: "CPL-01".into(),
            related_id: Uuid::new_v4(),
            related_kode: "CPMK-011".into(),
            related_nama: Some("Mampu menjelaskan".into()),
            weight: Some(Decimal::new(5000, 2)),
            created_at: Utc::now(),
        };
        let out = link.to_json(&CplCpmk::TABLE);
        assert_eq!(out["cpl_id"], json!(link.anchor_id));
        assert_eq!(out["cpmk"]["kode"], "CPMK-011");
        assert!(out.get("kontribusi_persen").is_some());

        let out = link.to_json(&PlMk::TABLE);
        assert!(out.get("kontribusi_persen").is_none());
    }

    #[test]
    fn status_parsing() {
        assert_eq!(CplMkStatus::parse("m"), Some(CplMkStatus::M));
        assert_eq!(CplMkStatus::parse("X"), None);
    }
}
