use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::database::manager::ConstraintViolation;
use crate::database::models::mapping::{MappingLink, MappingTable};
use crate::database::repository::existing_ids;
use crate::services::mapping_plan::{dedup, plan, ReplacePlan};
use crate::services::ServiceError;
use crate::types::TenantScope;
use crate::validation::FieldErrors;

/// What a mapping POST body asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingCommand {
    Single { anchor: Uuid, related: Uuid },
    Replace { anchor: Uuid, related: Vec<Uuid> },
}

fn uuid_field(body: &Value, field: &str, label: &str, errors: &mut FieldErrors) -> Option<Uuid> {
    match body.get(field) {
        None | Some(Value::Null) => {
            errors.add(field, format!("{} is required", label));
            None
        }
        Some(value) => {
            let parsed = value.as_str().and_then(|s| Uuid::parse_str(s).ok());
            if parsed.is_none() {
                errors.add(field, format!("{} must be a valid id", label));
            }
            parsed
        }
    }
}

fn uuid_list(value: &Value, field: &str, errors: &mut FieldErrors) -> Option<Vec<Uuid>> {
    let Some(items) = value.as_array() else {
        errors.add(field, "Must be an array of ids");
        return None;
    };
    let parsed: Option<Vec<Uuid>> = items
        .iter()
        .map(|item| item.as_str().and_then(|s| Uuid::parse_str(s).ok()))
        .collect();
    if parsed.is_none() {
        errors.add(field, "Every entry must be a valid id");
    }
    parsed
}

/// Classify a POST body. A list field selects Replace-Set, a single
/// related id selects one-link create.
pub fn parse_command(table: &MappingTable, body: &Value) -> Result<MappingCommand, FieldErrors> {
    let mut errors = FieldErrors::new();
    let anchor = uuid_field(body, table.anchor.fk, table.anchor.label, &mut errors);

    let command = match (body.get(table.related.ids_field), body.get(table.related.fk)) {
        (Some(list), _) if !list.is_null() => {
            let related = uuid_list(list, table.related.ids_field, &mut errors);
            if related.as_ref().map_or(false, |ids| ids.is_empty()) {
                errors.add(table.related.ids_field, "At least one id is required");
            }
            anchor.zip(related).map(|(anchor, related)| MappingCommand::Replace { anchor, related })
        }
        (_, Some(_)) => {
            let related = uuid_field(body, table.related.fk, table.related.label, &mut errors);
            anchor.zip(related).map(|(anchor, related)| MappingCommand::Single { anchor, related })
        }
        _ => {
            errors.add(table.related.ids_field, format!("{} is required", table.related.ids_field));
            None
        }
    };

    match command {
        Some(command) if errors.is_empty() => Ok(command),
        _ => Err(errors),
    }
}

/// Parse a PUT body: Replace-Set only, an empty list clears the anchor
pub fn parse_replace(table: &MappingTable, body: &Value) -> Result<(Uuid, Vec<Uuid>), FieldErrors> {
    let mut errors = FieldErrors::new();
    let anchor = uuid_field(body, table.anchor.fk, table.anchor.label, &mut errors);
    let related = match body.get(table.related.ids_field) {
        Some(list) if !list.is_null() => uuid_list(list, table.related.ids_field, &mut errors),
        _ => {
            errors.add(table.related.ids_field, format!("{} is required", table.related.ids_field));
            None
        }
    };

    match (anchor, related) {
        (Some(anchor), Some(related)) if errors.is_empty() => Ok((anchor, related)),
        _ => Err(errors),
    }
}

/// Even split of 100% across `n` links, two decimals
pub fn even_weight(n: usize) -> Decimal {
    if n == 0 {
        return Decimal::ONE_HUNDRED;
    }
    (Decimal::ONE_HUNDRED / Decimal::from(n as u64)).round_dp(2)
}

fn select_sql(table: &MappingTable) -> String {
    let weight = table
        .weight_column
        .map(|column| format!("m.\"{}\"", column))
        .unwrap_or_else(|| "NULL::numeric".to_string());
    format!(
        r#"SELECT m.id, m."{a_fk}" AS anchor_id, a."{a_code}" AS anchor_kode,
                  m."{r_fk}" AS related_id, r."{r_code}" AS related_kode,
                  r."{r_name}"::text AS related_nama, {weight} AS weight, m.created_at
           FROM "{table}" m
           JOIN "{a_table}" a ON a.id = m."{a_fk}"
           JOIN "{r_table}" r ON r.id = m."{r_fk}"
           WHERE ($1::uuid IS NULL OR a.program_studi_id = $1)
             AND ($2::uuid IS NULL OR m."{a_fk}" = $2)
             AND ($3::uuid IS NULL OR m.id = $3)
           ORDER BY m.created_at DESC, r."{r_code}" ASC"#,
        a_fk = table.anchor.fk,
        a_code = table.anchor.code_column,
        a_table = table.anchor.table,
        r_fk = table.related.fk,
        r_code = table.related.code_column,
        r_name = table.related.name_column,
        r_table = table.related.table,
        table = table.table,
        weight = weight,
    )
}

async fn select_links(
    conn: &mut PgConnection,
    table: &MappingTable,
    scope: &TenantScope,
    anchor: Option<Uuid>,
    link: Option<Uuid>,
) -> Result<Vec<MappingLink>, ServiceError> {
    let links = sqlx::query_as::<_, MappingLink>(&select_sql(table))
        .bind(scope.tenant())
        .bind(anchor)
        .bind(link)
        .fetch_all(conn)
        .await?;
    Ok(links)
}

/// Lock the anchor row and return its program studi
pub(crate) async fn lock_anchor(
    conn: &mut PgConnection,
    anchor_table: &'static str,
    anchor_field: &'static str,
    scope: &TenantScope,
    anchor: Uuid,
) -> Result<Uuid, ServiceError> {
    let sql = format!(
        "SELECT program_studi_id FROM \"{}\" WHERE id = $1 AND ($2::uuid IS NULL OR program_studi_id = $2) FOR UPDATE",
        anchor_table
    );
    let tenant: Option<Uuid> = sqlx::query_scalar(&sql)
        .bind(anchor)
        .bind(scope.tenant())
        .fetch_optional(conn)
        .await?;
    tenant.ok_or_else(|| ServiceError::MissingReferences {
        field: anchor_field.to_string(),
        ids: vec![anchor],
    })
}

/// Related ids must live in the anchor's program studi
pub(crate) async fn require_related(
    conn: &mut PgConnection,
    related_table: &'static str,
    field: &'static str,
    tenant: Uuid,
    ids: &[Uuid],
) -> Result<(), ServiceError> {
    let found = existing_ids(conn, related_table, ids, &TenantScope::ProgramStudi(tenant)).await?;
    let missing: Vec<Uuid> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::MissingReferences {
            field: field.to_string(),
            ids: missing,
        })
    }
}

/// Link tables between two tenant entities
pub struct MappingService {
    pool: PgPool,
    scope: TenantScope,
}

impl MappingService {
    pub fn new(pool: PgPool, scope: TenantScope) -> Self {
        Self { pool, scope }
    }

    pub async fn list(&self, table: &MappingTable, anchor: Option<Uuid>) -> Result<Vec<MappingLink>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        select_links(&mut conn, table, &self.scope, anchor, None).await
    }

    /// Leave the anchor mapped to exactly `related`, then return that set
    pub async fn replace(
        &self,
        table: &MappingTable,
        anchor: Uuid,
        related: &[Uuid],
    ) -> Result<Vec<MappingLink>, ServiceError> {
        let desired = dedup(related);

        let mut tx = self.pool.begin().await?;
        let tenant = lock_anchor(&mut tx, table.anchor.table, table.anchor.fk, &self.scope, anchor).await?;
        require_related(&mut tx, table.related.table, table.related.ids_field, tenant, &desired).await?;

        let existing_sql = format!(
            "SELECT \"{}\" FROM \"{}\" WHERE \"{}\" = $1",
            table.related.fk, table.table, table.anchor.fk
        );
        let existing: Vec<Uuid> = sqlx::query_scalar(&existing_sql)
            .bind(anchor)
            .fetch_all(&mut *tx)
            .await?;

        let plan = plan(table.strategy, &existing, &desired);
        apply_plan(&mut tx, table, anchor, &plan, desired.len()).await?;

        let links = select_links(&mut tx, table, &self.scope, Some(anchor), None).await?;
        tx.commit().await?;

        tracing::info!(
            mapping = table.slug,
            anchor = %anchor,
            removed = plan.to_delete.len(),
            added = plan.to_insert.len(),
            "mapping set replaced"
        );
        Ok(links)
    }

    pub async fn create_one(&self, table: &MappingTable, anchor: Uuid, related: Uuid) -> Result<MappingLink, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let tenant = lock_anchor(&mut tx, table.anchor.table, table.anchor.fk, &self.scope, anchor).await?;
        require_related(&mut tx, table.related.table, table.related.fk, tenant, &[related]).await?;

        let sql = format!(
            "INSERT INTO \"{}\" (\"{}\", \"{}\") VALUES ($1, $2) RETURNING id",
            table.table, table.anchor.fk, table.related.fk
        );
        let id: Uuid = sqlx::query_scalar(&sql)
            .bind(anchor)
            .bind(related)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| match ConstraintViolation::classify(&err) {
                Some(ConstraintViolation::Unique(_)) => ServiceError::Rejected("Mapping already exists".to_string()),
                _ => err.into(),
            })?;

        let link = select_links(&mut tx, table, &self.scope, None, Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound("Mapping not found".to_string()))?;
        tx.commit().await?;

        tracing::info!(mapping = table.slug, id = %id, "mapping created");
        Ok(link)
    }

    /// The link's anchor must be inside the caller's scope
    pub async fn delete_one(&self, table: &MappingTable, id: Uuid) -> Result<(), ServiceError> {
        let sql = format!(
            "DELETE FROM \"{}\" m USING \"{}\" a WHERE m.id = $1 AND a.id = m.\"{}\" AND ($2::uuid IS NULL OR a.program_studi_id = $2)",
            table.table, table.anchor.table, table.anchor.fk
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(self.scope.tenant())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Mapping not found".to_string()));
        }
        tracing::info!(mapping = table.slug, id = %id, "mapping deleted");
        Ok(())
    }
}

async fn apply_plan(
    conn: &mut PgConnection,
    table: &MappingTable,
    anchor: Uuid,
    plan: &ReplacePlan,
    set_size: usize,
) -> Result<(), ServiceError> {
    if !plan.to_delete.is_empty() {
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = $1 AND \"{}\" = ANY($2)",
            table.table, table.anchor.fk, table.related.fk
        );
        sqlx::query(&sql)
            .bind(anchor)
            .bind(&plan.to_delete)
            .execute(&mut *conn)
            .await?;
    }

    if plan.to_insert.is_empty() {
        return Ok(());
    }

    match table.weight_column {
        Some(column) => {
            let sql = format!(
                "INSERT INTO \"{}\" (\"{}\", \"{}\", \"{}\") SELECT $1, UNNEST($2::uuid[]), $3",
                table.table, table.anchor.fk, table.related.fk, column
            );
            sqlx::query(&sql)
                .bind(anchor)
                .bind(&plan.to_insert)
                .bind(even_weight(set_size))
                .execute(&mut *conn)
                .await?;
        }
        None => {
            let sql = format!(
                "INSERT INTO \"{}\" (\"{}\", \"{}\") SELECT $1, UNNEST($2::uuid[])",
                table.table, table.anchor.fk, table.related.fk
            );
            sqlx::query(&sql)
                .bind(anchor)
                .bind(&plan.to_insert)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::mapping::{BkMk, CplCpmk, MappingPair, PlCpl};
    use serde_json::json;

    #[test]
    fn list_body_is_a_replace() {
        let cpl = Uuid::new_v4();
        let cpmk = Uuid::new_v4();
        let body = json!({ "cpl_id": cpl, "cpmk_ids": [cpmk, cpmk] });
        assert_eq!(
            parse_command(&CplCpmk::TABLE, &body).unwrap(),
            MappingCommand::Replace { anchor: cpl, related: vec![cpmk, cpmk] }
        );
    }

    #[test]
    fn single_body_is_a_create() {
        let pl = Uuid::new_v4();
        let cpl = Uuid::new_v4();
        let body = json!({ "profil_lulusan_id": pl, "cpl_id": cpl });
        assert_eq!(
            parse_command(&PlCpl::TABLE, &body).unwrap(),
            MappingCommand::Single { anchor: pl, related: cpl }
        );
    }

    #[test]
    fn post_rejects_empty_and_malformed_lists() {
        let bk = Uuid::new_v4();
        let errors = parse_command(&BkMk::TABLE, &json!({ "bahan_kajian_id": bk, "mata_kuliah_ids": [] })).unwrap_err();
        assert!(errors.get("mata_kuliah_ids").is_some());

        let errors =
            parse_command(&BkMk::TABLE, &json!({ "bahan_kajian_id": bk, "mata_kuliah_ids": ["nope"] })).unwrap_err();
        assert!(errors.get("mata_kuliah_ids").is_some());

        let errors = parse_command(&BkMk::TABLE, &json!({ "mata_kuliah_ids": [] })).unwrap_err();
        assert!(errors.get("bahan_kajian_id").is_some());
    }

    #[test]
    fn put_allows_empty_set() {
        let bk = Uuid::new_v4();
        let (anchor, related) =
            parse_replace(&BkMk::TABLE, &json!({ "bahan_kajian_id": bk, "mata_kuliah_ids": [] })).unwrap();
        assert_eq!(anchor, bk);
        assert!(related.is_empty());

        let errors = parse_replace(&BkMk::TABLE, &json!({ "bahan_kajian_id": bk })).unwrap_err();
        assert!(errors.get("mata_kuliah_ids").is_some());
    }

    #[test]
    fn weights_split_evenly() {
        assert_eq!(even_weight(1), Decimal::ONE_HUNDRED);
        assert_eq!(even_weight(4), Decimal::new(25, 0));
        assert_eq!(even_weight(3), Decimal::new(3333, 2));
    }

    #[test]
    fn select_joins_both_ends() {
        let sql = select_sql(&CplCpmk::TABLE);
        assert!(sql.contains("FROM \"cpmk_cpl_mapping\" m"));
        assert!(sql.contains("JOIN \"cpl\" a ON a.id = m.\"cpl_id\""));
        assert!(sql.contains("m.\"kontribusi_persen\" AS weight"));

        let sql = select_sql(&PlCpl::TABLE);
        assert!(sql.contains("NULL::numeric AS weight"));
    }
}
