use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::database::manager::ConstraintViolation;
use crate::database::models::mapping::{CplMkMapping, CplMkStatus, CPL, MATA_KULIAH};
use crate::services::mapping_service::{lock_anchor, require_related};
use crate::services::ServiceError;
use crate::types::TenantScope;
use crate::validation::FieldErrors;

const STATUS_NAMES: &[&str] = &["I", "R", "M", "A"];

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CplMkEntryInput {
    pub mata_kuliah_id: Option<Uuid>,
    pub status: Option<String>,
    pub semester_target: Option<i32>,
    pub bobot_status: Option<Decimal>,
}

/// POST / PUT body: either one link or a `mata_kuliah_mappings` set
#[derive(Debug, Default, Deserialize)]
pub struct CplMkBody {
    pub cpl_id: Option<Uuid>,
    pub mata_kuliah_mappings: Option<Vec<CplMkEntryInput>>,
    #[serde(flatten)]
    pub entry: CplMkEntryInput,
}

/// `PUT /:id`; absent fields keep their stored value
#[derive(Debug, Default, Deserialize)]
pub struct CplMkAttributesInput {
    pub status: Option<String>,
    pub semester_target: Option<i32>,
    pub bobot_status: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CplMkEntry {
    pub mata_kuliah_id: Uuid,
    pub status: CplMkStatus,
    pub semester_target: Option<i32>,
    pub bobot_status: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CplMkCommand {
    Single { cpl_id: Uuid, entry: CplMkEntry },
    Replace { cpl_id: Uuid, entries: Vec<CplMkEntry> },
}

fn parse_status(errors: &mut FieldErrors, field: &str, value: &str) -> Option<CplMkStatus> {
    let status = CplMkStatus::parse(value);
    if status.is_none() {
        errors.one_of(field, "Status", value, STATUS_NAMES);
    }
    status
}

fn check_semester(errors: &mut FieldErrors, field: &str, semester: Option<i32>) {
    if let Some(semester) = semester {
        errors.int_range(field, "Semester target", semester, 1, Some(8));
    }
}

fn check_bobot(errors: &mut FieldErrors, field: &str, bobot: Decimal) {
    errors.decimal_range(field, "Bobot status", bobot, Decimal::ZERO, Decimal::ONE_HUNDRED);
}

/// Field names are prefixed so list entries report as `mata_kuliah_mappings[2].status`
fn validate_entry(input: CplMkEntryInput, prefix: &str, errors: &mut FieldErrors) -> Option<CplMkEntry> {
    let field = |name: &str| format!("{}{}", prefix, name);

    let mata_kuliah_id = errors.required(&field("mata_kuliah_id"), "Mata kuliah", input.mata_kuliah_id);
    let status = errors
        .required_text(&field("status"), "Status", input.status)
        .and_then(|s| parse_status(errors, &field("status"), &s));
    let bobot_status = errors.required(&field("bobot_status"), "Bobot status", input.bobot_status);

    check_semester(errors, &field("semester_target"), input.semester_target);
    if let Some(bobot) = bobot_status {
        check_bobot(errors, &field("bobot_status"), bobot);
    }

    Some(CplMkEntry {
        mata_kuliah_id: mata_kuliah_id?,
        status: status?,
        semester_target: input.semester_target,
        bobot_status: bobot_status?,
    })
}

fn parse_entries(list: Vec<CplMkEntryInput>, errors: &mut FieldErrors) -> Vec<CplMkEntry> {
    let mut entries = Vec::with_capacity(list.len());
    let mut seen = HashSet::new();
    for (i, input) in list.into_iter().enumerate() {
        if let Some(entry) = validate_entry(input, &format!("mata_kuliah_mappings[{}].", i), errors) {
            if seen.insert(entry.mata_kuliah_id) {
                entries.push(entry);
            }
        }
    }
    entries
}

/// POST body: a non-empty set replaces, otherwise the flattened fields form one link
pub fn parse_body(body: CplMkBody) -> Result<CplMkCommand, FieldErrors> {
    let mut errors = FieldErrors::new();
    let cpl_id = errors.required("cpl_id", "CPL", body.cpl_id);

    let command = match body.mata_kuliah_mappings {
        Some(list) => {
            if list.is_empty() {
                errors.add("mata_kuliah_mappings", "At least one mapping is required");
            }
            let entries = parse_entries(list, &mut errors);
            cpl_id.map(|cpl_id| CplMkCommand::Replace { cpl_id, entries })
        }
        None => {
            let entry = validate_entry(body.entry, "", &mut errors);
            cpl_id.zip(entry).map(|(cpl_id, entry)| CplMkCommand::Single { cpl_id, entry })
        }
    };

    match command {
        Some(command) if errors.is_empty() => Ok(command),
        _ => Err(errors),
    }
}

/// PUT body: the set is required and may be empty, which clears the CPL
pub fn parse_replace_body(body: CplMkBody) -> Result<(Uuid, Vec<CplMkEntry>), FieldErrors> {
    let mut errors = FieldErrors::new();
    let cpl_id = errors.required("cpl_id", "CPL", body.cpl_id);
    let entries = errors
        .required("mata_kuliah_mappings", "mata_kuliah_mappings", body.mata_kuliah_mappings)
        .map(|list| parse_entries(list, &mut errors));

    match (cpl_id, entries) {
        (Some(cpl_id), Some(entries)) if errors.is_empty() => Ok((cpl_id, entries)),
        _ => Err(errors),
    }
}

const SELECT: &str = r#"
    SELECT m.id, m.cpl_id, m.mata_kuliah_id, m.status, m.semester_target, m.bobot_status,
           c.kode_cpl, mk.kode_mk, mk.nama_mk, m.created_at, m.updated_at
    FROM cpl_mk_mapping m
    JOIN cpl c ON c.id = m.cpl_id
    JOIN mata_kuliah mk ON mk.id = m.mata_kuliah_id
    WHERE ($1::uuid IS NULL OR c.program_studi_id = $1)
      AND ($2::uuid IS NULL OR m.cpl_id = $2)
      AND ($3::uuid IS NULL OR m.mata_kuliah_id = $3)
      AND ($4::uuid IS NULL OR m.id = $4)
    ORDER BY c.kode_cpl ASC, mk.semester ASC, mk.kode_mk ASC
"#;

async fn select(
    conn: &mut PgConnection,
    scope: &TenantScope,
    cpl_id: Option<Uuid>,
    mata_kuliah_id: Option<Uuid>,
    id: Option<Uuid>,
) -> Result<Vec<CplMkMapping>, ServiceError> {
    let rows = sqlx::query_as::<_, CplMkMapping>(SELECT)
        .bind(scope.tenant())
        .bind(cpl_id)
        .bind(mata_kuliah_id)
        .bind(id)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

async fn insert(conn: &mut PgConnection, cpl_id: Uuid, entry: &CplMkEntry) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO cpl_mk_mapping (cpl_id, mata_kuliah_id, status, semester_target, bobot_status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(cpl_id)
    .bind(entry.mata_kuliah_id)
    .bind(entry.status)
    .bind(entry.semester_target)
    .bind(entry.bobot_status)
    .fetch_one(conn)
    .await
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Mapping not found".to_string())
}

/// CPL to course links carrying an I/R/M/A status and a weight
pub struct CplMkService {
    pool: PgPool,
    scope: TenantScope,
}

impl CplMkService {
    pub fn new(pool: PgPool, scope: TenantScope) -> Self {
        Self { pool, scope }
    }

    pub async fn list(&self, cpl_id: Option<Uuid>, mata_kuliah_id: Option<Uuid>) -> Result<Vec<CplMkMapping>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        select(&mut conn, &self.scope, cpl_id, mata_kuliah_id, None).await
    }

    pub async fn create_one(&self, cpl_id: Uuid, entry: &CplMkEntry) -> Result<CplMkMapping, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let tenant = lock_anchor(&mut tx, CPL.table, CPL.fk, &self.scope, cpl_id).await?;
        require_related(&mut tx, MATA_KULIAH.table, MATA_KULIAH.fk, tenant, &[entry.mata_kuliah_id]).await?;

        let id = insert(&mut tx, cpl_id, entry)
            .await
            .map_err(|err| match ConstraintViolation::classify(&err) {
                Some(ConstraintViolation::Unique(_)) => ServiceError::Rejected("Mapping already exists".to_string()),
                _ => err.into(),
            })?;
        let row = select(&mut tx, &self.scope, None, None, Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(not_found)?;
        tx.commit().await?;

        tracing::info!(id = %id, cpl_id = %cpl_id, "cpl-mk mapping created");
        Ok(row)
    }

    /// Full replacement of the CPL's course links; an empty set clears it
    pub async fn replace(&self, cpl_id: Uuid, entries: &[CplMkEntry]) -> Result<Vec<CplMkMapping>, ServiceError> {
        let mut tx = self.pool.begin().await?;
        let tenant = lock_anchor(&mut tx, CPL.table, CPL.fk, &self.scope, cpl_id).await?;
        let course_ids: Vec<Uuid> = entries.iter().map(|e| e.mata_kuliah_id).collect();
        require_related(&mut tx, MATA_KULIAH.table, "mata_kuliah_mappings", tenant, &course_ids).await?;

        let removed = sqlx::query("DELETE FROM cpl_mk_mapping WHERE cpl_id = $1")
            .bind(cpl_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        for entry in entries {
            insert(&mut tx, cpl_id, entry).await?;
        }

        let rows = select(&mut tx, &self.scope, Some(cpl_id), None, None).await?;
        tx.commit().await?;

        tracing::info!(cpl_id = %cpl_id, removed, added = entries.len(), "cpl-mk mapping set replaced");
        Ok(rows)
    }

    pub async fn update_attributes(&self, id: Uuid, input: CplMkAttributesInput) -> Result<CplMkMapping, ServiceError> {
        let mut errors = FieldErrors::new();
        let status = input
            .status
            .as_deref()
            .and_then(|s| parse_status(&mut errors, "status", s));
        check_semester(&mut errors, "semester_target", input.semester_target);
        if let Some(bobot) = input.bobot_status {
            check_bobot(&mut errors, "bobot_status", bobot);
        }
        errors.into_result()?;

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE cpl_mk_mapping m
            SET status = COALESCE($3, m.status),
                semester_target = COALESCE($4, m.semester_target),
                bobot_status = COALESCE($5, m.bobot_status),
                updated_at = NOW()
            FROM cpl c
            WHERE m.id = $1 AND c.id = m.cpl_id AND ($2::uuid IS NULL OR c.program_studi_id = $2)
            "#,
        )
        .bind(id)
        .bind(self.scope.tenant())
        .bind(status)
        .bind(input.semester_target)
        .bind(input.bobot_status)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(not_found());
        }

        let row = select(&mut tx, &self.scope, None, None, Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(not_found)?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn delete_one(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query(
            "DELETE FROM cpl_mk_mapping m USING cpl c WHERE m.id = $1 AND c.id = m.cpl_id AND ($2::uuid IS NULL OR c.program_studi_id = $2)",
        )
        .bind(id)
        .bind(self.scope.tenant())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        tracing::info!(id = %id, "cpl-mk mapping deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> CplMkBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn single_link_body() {
        let cpl = Uuid::new_v4();
        let mk = Uuid::new_v4();
        let command = parse_body(
            body(json!({ "cpl_id": cpl, "mata_kuliah_id": mk, "status": "m", "bobot_status": 40 })),
        )
        .unwrap();
        let CplMkCommand::Single { cpl_id, entry } = command else {
            panic!("expected a single link");
        };
        assert_eq!(cpl_id, cpl);
        assert_eq!(entry.status, CplMkStatus::M);
        assert_eq!(entry.bobot_status, Decimal::new(40, 0));
        assert_eq!(entry.semester_target, None);
    }

    #[test]
    fn replace_dedups_by_course() {
        let cpl = Uuid::new_v4();
        let mk = Uuid::new_v4();
        let (cpl_id, entries) = parse_replace_body(body(json!({
            "cpl_id": cpl,
            "mata_kuliah_mappings": [
                { "mata_kuliah_id": mk, "status": "I", "bobot_status": 20, "semester_target": 1 },
                { "mata_kuliah_id": mk, "status": "A", "bobot_status": 80 }
            ]
        })))
        .unwrap();
        assert_eq!(cpl_id, cpl);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, CplMkStatus::I);
    }

    #[test]
    fn empty_set_only_on_put() {
        let cpl = Uuid::new_v4();
        let put = parse_replace_body(body(json!({ "cpl_id": cpl, "mata_kuliah_mappings": [] }))).unwrap();
        assert_eq!(put, (cpl, vec![]));

        let post = parse_body(body(json!({ "cpl_id": cpl, "mata_kuliah_mappings": [] }))).unwrap_err();
        assert!(post.get("mata_kuliah_mappings").is_some());
    }

    #[test]
    fn put_requires_the_set() {
        // A single-link body is not a replacement
        let errors = parse_replace_body(body(json!({
            "cpl_id": Uuid::new_v4(),
            "mata_kuliah_id": Uuid::new_v4(),
            "status": "I",
            "bobot_status": 10
        })))
        .unwrap_err();
        assert!(errors.get("mata_kuliah_mappings").is_some());
    }

    #[test]
    fn entry_errors_are_indexed() {
        let errors = parse_body(
            body(json!({
                "cpl_id": Uuid::new_v4(),
                "mata_kuliah_mappings": [
                    { "mata_kuliah_id": Uuid::new_v4(), "status": "X", "bobot_status": 120, "semester_target": 9 }
                ]
            })),
        )
        .unwrap_err();
        assert!(errors.get("mata_kuliah_mappings[0].status").is_some());
        assert!(errors.get("mata_kuliah_mappings[0].bobot_status").is_some());
        assert!(errors.get("mata_kuliah_mappings[0].semester_target").is_some());
    }
}
