//! Parameterized SELECT / UPDATE / DELETE for registry tables.
//! Identifiers come from the registry only; values are always bind parameters.

use crate::config::{EntityTable, ReferenceField};
use crate::sql::PgBindValue;

pub const USERS_TABLE: &str = "users";
pub const USER_STATUS_DELETED: &str = "DELETED";

/// Quote an identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn push_param(&mut self, v: PgBindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Listing parameters, already checked against the entity's columns.
#[derive(Clone, Debug)]
pub struct ListQuery {
    pub search_term: Option<String>,
    pub filters: Vec<(String, PgBindValue)>,
    pub page: u32,
    pub limit: u32,
    pub sort_by: String,
    pub sort_order: SortOrder,
}

impl ListQuery {
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1).max(0) * i64::from(self.limit)
    }
}

pub fn select_column_list(entity: &EntityTable) -> String {
    entity
        .columns
        .iter()
        .map(|c| quoted(c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `$1` = id. With `lock`, the row stays locked until the surrounding transaction ends.
pub fn select_active_by_id(schema: &str, entity: &EntityTable, lock: bool) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = $1 AND {} = FALSE{}",
        select_column_list(entity),
        qualified_table(schema, entity.table_name),
        quoted(entity.pk_column),
        quoted(entity.deleted_flag),
        if lock { " FOR UPDATE" } else { "" }
    )
}

/// `$1` = id.
pub fn delete_by_id(schema: &str, entity: &EntityTable) -> String {
    format!(
        "DELETE FROM {} WHERE {} = $1 RETURNING {}",
        qualified_table(schema, entity.table_name),
        quoted(entity.pk_column),
        select_column_list(entity)
    )
}

/// `$1` = id.
pub fn mark_deleted(schema: &str, entity: &EntityTable) -> String {
    format!(
        "UPDATE {} SET {} = TRUE, \"updated_at\" = NOW() WHERE {} = $1 RETURNING {}",
        qualified_table(schema, entity.table_name),
        quoted(entity.deleted_flag),
        quoted(entity.pk_column),
        select_column_list(entity)
    )
}

/// `$1` = the reference value taken from the profile row.
pub fn delete_user_by(schema: &str, reference: ReferenceField) -> String {
    format!(
        "DELETE FROM {} WHERE {} = $1",
        qualified_table(schema, USERS_TABLE),
        quoted(reference.user_column())
    )
}

/// `$1` = the reference value taken from the profile row.
pub fn mark_user_deleted(schema: &str, reference: ReferenceField) -> String {
    format!(
        "UPDATE {} SET \"status\" = '{}', \"updated_at\" = NOW() WHERE {} = $1",
        qualified_table(schema, USERS_TABLE),
        USER_STATUS_DELETED,
        quoted(reference.user_column())
    )
}

/// UPDATE of the given (column, value) pairs on a non-deleted row; `updated_at` is always bumped.
pub fn update_active(schema: &str, entity: &EntityTable, id: uuid::Uuid, body: Vec<(String, PgBindValue)>) -> QueryBuf {
    let mut q = QueryBuf::default();
    let mut sets = Vec::with_capacity(body.len() + 1);
    for (col, val) in body {
        let n = q.push_param(val);
        sets.push(format!("{} = ${}", quoted(&col), n));
    }
    sets.push("\"updated_at\" = NOW()".to_string());
    let id_param = q.push_param(PgBindValue::Uuid(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} AND {} = FALSE RETURNING {}",
        qualified_table(schema, entity.table_name),
        sets.join(", "),
        quoted(entity.pk_column),
        id_param,
        quoted(entity.deleted_flag),
        select_column_list(entity)
    );
    q
}

fn where_active(q: &mut QueryBuf, entity: &EntityTable, list: &ListQuery) -> String {
    let mut parts = vec![format!("{} = FALSE", quoted(entity.deleted_flag))];
    if let Some(term) = list.search_term.as_deref().filter(|t| !t.is_empty()) {
        let n = q.push_param(PgBindValue::Text(format!("%{}%", escape_like(term))));
        let ors: Vec<String> = entity
            .searchable_columns()
            .map(|c| format!("{} ILIKE ${}", quoted(c.name), n))
            .collect();
        if !ors.is_empty() {
            parts.push(format!("({})", ors.join(" OR ")));
        }
    }
    for (col, val) in &list.filters {
        let n = q.push_param(val.clone());
        parts.push(format!("{} = ${}", quoted(col), n));
    }
    parts.join(" AND ")
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub fn select_list(schema: &str, entity: &EntityTable, list: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_sql = where_active(&mut q, entity, list);
    let limit = q.push_param(PgBindValue::I64(i64::from(list.limit)));
    let offset = q.push_param(PgBindValue::I64(list.offset()));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} ORDER BY {} {} LIMIT ${} OFFSET ${}",
        select_column_list(entity),
        qualified_table(schema, entity.table_name),
        where_sql,
        quoted(&list.sort_by),
        list.sort_order.keyword(),
        limit,
        offset
    );
    q
}

pub fn count_list(schema: &str, entity: &EntityTable, list: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_sql = where_active(&mut q, entity, list);
    q.sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {}",
        qualified_table(schema, entity.table_name),
        where_sql
    );
    q
}
