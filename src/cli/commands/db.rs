use clap::Subcommand;
use serde_json::{json, Map, Value};

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

const TABLES: &[&str] = &[
    "program_studi",
    "users",
    "profil_lulusan",
    "cpl",
    "mata_kuliah",
    "cpmk",
    "bahan_kajian",
    "kurikulum",
    "pl_cpl_mapping",
    "cpmk_cpl_mapping",
    "cpl_bk_mapping",
    "bk_mk_mapping",
    "kurikulum_cpl_mapping",
    "kurikulum_mk_mapping",
    "pl_mk_mapping",
    "cpl_mk_mapping",
];

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Apply pending migrations")]
    Migrate,

    #[command(about = "Check connectivity and count rows per table")]
    Check,
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DbCommands::Migrate => {
            DatabaseManager::migrate().await?;
            output_success(output_format, "Migrations applied", None)
        }
        DbCommands::Check => {
            DatabaseManager::health_check().await?;
            let pool = DatabaseManager::pool().await?;

            let mut counts = Map::new();
            for table in TABLES {
                let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", table))
                    .fetch_one(&pool)
                    .await?;
                counts.insert(table.to_string(), json!(count));
            }
            output_success(output_format, "Database reachable", Some(Value::Object(counts)))
        }
    }
}
