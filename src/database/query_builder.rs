use sqlx::{self, postgres::PgArguments, FromRow, PgConnection};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::types::TenantScope;

/// Positional parameter collected while composing a statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Uuid(Uuid),
    Text(String),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// SELECT composer for a single table. Table and column names come from
/// compile-time constants; every caller-supplied value is bound.
pub struct QueryBuilder<T> {
    table_name: &'static str,
    conditions: Vec<String>,
    params: Vec<SqlParam>,
    order_by: Option<&'static str>,
    limit: Option<i64>,
    offset: Option<i64>,
    lock: bool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(table_name: &'static str) -> Self {
        Self {
            table_name,
            conditions: Vec::new(),
            params: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
            lock: false,
            _phantom: std::marker::PhantomData,
        }
    }

    fn placeholder(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    pub fn where_eq(mut self, column: &'static str, param: SqlParam) -> Self {
        let p = self.placeholder(param);
        self.conditions.push(format!("\"{}\" = {}", column, p));
        self
    }

    /// Restrict to the scope's program studi; `All` adds nothing
    pub fn scoped(self, column: &'static str, scope: &TenantScope) -> Self {
        match scope.tenant() {
            Some(id) => self.where_eq(column, SqlParam::Uuid(id)),
            None => self,
        }
    }

    /// Case-insensitive substring match over any of the columns
    pub fn search(mut self, columns: &[&'static str], term: Option<&str>) -> Self {
        let term = match term.map(str::trim) {
            Some(t) if !t.is_empty() && !columns.is_empty() => t,
            _ => return self,
        };
        let p = self.placeholder(SqlParam::Text(format!("%{}%", escape_like(term))));
        let ors = columns
            .iter()
            .map(|c| format!("\"{}\" ILIKE {}", c, p))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.conditions.push(format!("({})", ors));
        self
    }

    pub fn order_by(mut self, order_by: &'static str) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn paginate(mut self, limit: i64, offset: Option<i64>) -> Self {
        self.limit = Some(limit);
        self.offset = offset.filter(|o| *o > 0);
        self
    }

    pub fn for_update(mut self) -> Self {
        self.lock = true;
        self
    }

    pub fn to_sql(&self) -> SqlResult {
        let mut query = format!("SELECT * FROM \"{}\"", self.table_name);
        if !self.conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&self.conditions.join(" AND "));
        }
        if let Some(order_by) = self.order_by {
            query.push_str(" ORDER BY ");
            query.push_str(order_by);
        }
        if let Some(limit) = self.limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            query.push_str(&format!(" OFFSET {}", offset));
        }
        if self.lock {
            query.push_str(" FOR UPDATE");
        }
        SqlResult { query, params: self.params.clone() }
    }

    pub async fn select_all(self, conn: &mut PgConnection) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.to_sql();
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(conn).await?;
        Ok(rows)
    }

    pub async fn select_optional(self, conn: &mut PgConnection) -> Result<Option<T>, DatabaseError> {
        let sql_result = self.to_sql();
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let row = q.fetch_optional(conn).await?;
        Ok(row)
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q SqlParam,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        SqlParam::Uuid(id) => q.bind(*id),
        SqlParam::Text(s) => q.bind(s.as_str()),
        SqlParam::Int(i) => q.bind(*i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(sqlx::FromRow)]
    #[allow(dead_code)]
    struct Row {
        id: Uuid,
    }

    #[test]
    fn scoped_search_with_paging() {
        let ps = Uuid::new_v4();
        let sql = QueryBuilder::<Row>::new("cpl")
            .scoped("program_studi_id", &TenantScope::ProgramStudi(ps))
            .search(&["kode_cpl", "deskripsi"], Some(" etika "))
            .order_by("kode_cpl ASC")
            .paginate(50, Some(10))
            .to_sql();

        assert_eq!(
            sql.query,
            "SELECT * FROM \"cpl\" WHERE \"program_studi_id\" = $1 AND (\"kode_cpl\" ILIKE $2 OR \"deskripsi\" ILIKE $2) ORDER BY kode_cpl ASC LIMIT 50 OFFSET 10"
        );
        assert_eq!(sql.params, vec![SqlParam::Uuid(ps), SqlParam::Text("%etika%".into())]);
    }

    #[test]
    fn unscoped_blank_search_adds_nothing() {
        let sql = QueryBuilder::<Row>::new("kurikulum")
            .scoped("program_studi_id", &TenantScope::All)
            .search(&["kode_kurikulum"], Some("   "))
            .to_sql();
        assert_eq!(sql.query, "SELECT * FROM \"kurikulum\"");
        assert!(sql.params.is_empty());
    }

    #[test]
    fn like_wildcards_are_escaped() {
        let sql = QueryBuilder::<Row>::new("cpl").search(&["kode_cpl"], Some("50%_x")).to_sql();
        assert_eq!(sql.params, vec![SqlParam::Text("%50\\%\\_x%".into())]);
    }

    #[test]
    fn lock_clause_goes_last() {
        let sql = QueryBuilder::<Row>::new("cpl")
            .where_eq("id", SqlParam::Uuid(Uuid::nil()))
            .for_update()
            .to_sql();
        assert!(sql.query.ends_with("WHERE \"id\" = $1 FOR UPDATE"));
    }
}
