//! Read, list and update of registry entities. Deletion lives in [`super::eraser`].

use crate::case::{snake_case_keys, to_camel_case, to_snake_case};
use crate::config::EntityTable;
use crate::error::{AppError, ValidationIssue};
use crate::service::eraser::find_active_by_id;
use crate::service::rows::{bind_all, row_to_json};
use crate::sql::{self, ListQuery, PgBindValue, SortOrder};
use serde_json::{Map, Value};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;
const DEFAULT_SORT_BY: &str = "created_at";

pub struct ProfileService;

impl ProfileService {
    /// Returns the page of rows and the total count matching the same filters.
    pub async fn list(
        pool: &PgPool,
        schema: &str,
        entity: &EntityTable,
        query: &ListQuery,
    ) -> Result<(Vec<Value>, i64), AppError> {
        let q = sql::select_list(schema, entity, query);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params).fetch_all(pool).await?;
        let data = rows
            .iter()
            .map(|r| row_to_json(r, entity.columns))
            .collect::<Result<Vec<_>, _>>()?;

        let c = sql::count_list(schema, entity, query);
        let total: i64 = bind_all(sqlx::query(&c.sql), &c.params)
            .fetch_one(pool)
            .await
            .and_then(|row| sqlx::Row::try_get(&row, 0))?;
        Ok((data, total))
    }

    pub async fn read(pool: &PgPool, schema: &str, entity: &EntityTable, id: Uuid) -> Result<Value, AppError> {
        let mut conn = pool.acquire().await?;
        find_active_by_id(&mut conn, schema, entity, id, false).await
    }

    /// Apply a validated camelCase body to a non-deleted record.
    pub async fn update(
        pool: &PgPool,
        schema: &str,
        entity: &EntityTable,
        id: Uuid,
        body: Map<String, Value>,
    ) -> Result<Value, AppError> {
        let mut pairs = Vec::with_capacity(body.len());
        for (column, value) in snake_case_keys(body) {
            let key = api_name(&column);
            let def = entity
                .column(&column)
                .filter(|c| c.updatable)
                .ok_or_else(|| AppError::schema_issue(key.as_str(), format!("Unrecognized key '{}'", key)))?;
            pairs.push((column, PgBindValue::for_column(def.kind, &key, &value)?));
        }
        let q = sql::update_active(schema, entity, id, pairs);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", entity.model.label())))?;
        row_to_json(&row, entity.columns)
    }
}

/// Build a [`ListQuery`] from raw query-string parameters (camelCase keys).
/// Keys that are neither paging options nor filterable columns are ignored.
pub fn list_query_from_params(entity: &EntityTable, params: &HashMap<String, String>) -> Result<ListQuery, AppError> {
    let mut issues = Vec::new();
    let mut query = ListQuery {
        search_term: None,
        filters: Vec::new(),
        page: DEFAULT_PAGE,
        limit: DEFAULT_LIMIT,
        sort_by: DEFAULT_SORT_BY.to_string(),
        sort_order: SortOrder::default(),
    };

    for (key, raw) in params {
        match key.as_str() {
            "searchTerm" => query.search_term = Some(raw.trim().to_string()).filter(|s| !s.is_empty()),
            "page" => match raw.parse::<u32>() {
                Ok(p) if p >= 1 => query.page = p,
                _ => issues.push(ValidationIssue::new("page", "Page must be a positive integer")),
            },
            "limit" => match raw.parse::<u32>() {
                Ok(l) if l >= 1 => query.limit = l.min(MAX_LIMIT),
                _ => issues.push(ValidationIssue::new("limit", "Limit must be a positive integer")),
            },
            "sortBy" => {
                let column = to_snake_case(raw);
                if entity.column(&column).is_some() {
                    query.sort_by = column;
                } else {
                    issues.push(ValidationIssue::new(
                        "sortBy",
                        format!("Cannot sort by '{}'", raw),
                    ));
                }
            }
            "sortOrder" => match raw.to_ascii_lowercase().as_str() {
                "asc" => query.sort_order = SortOrder::Asc,
                "desc" => query.sort_order = SortOrder::Desc,
                _ => issues.push(ValidationIssue::new(
                    "sortOrder",
                    "Sort order must be 'asc' or 'desc'",
                )),
            },
            _ => {
                let column = to_snake_case(key);
                if let Some(def) = entity.column(&column).filter(|c| c.filterable) {
                    match PgBindValue::for_column(def.kind, key, &Value::String(raw.clone())) {
                        Ok(v) => query.filters.push((column, v)),
                        Err(e) => issues.extend(e.issues().iter().cloned()),
                    }
                }
            }
        }
    }

    if issues.is_empty() {
        // deterministic placeholder numbering regardless of HashMap order
        query.filters.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(query)
    } else {
        Err(AppError::SchemaValidation(issues))
    }
}

/// camelCase name of a column, as exposed to clients.
pub fn api_name(column: &str) -> String {
    to_camel_case(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelName;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn defaults_when_no_params() {
        let q = list_query_from_params(ModelName::Admin.table(), &params(&[])).unwrap();
        assert_eq!((q.page, q.limit), (1, 10));
        assert_eq!(q.sort_by, "created_at");
        assert_eq!(q.sort_order, SortOrder::Desc);
        assert!(q.search_term.is_none());
    }

    #[test]
    fn filters_and_paging_are_parsed() {
        let q = list_query_from_params(
            ModelName::Doctor.table(),
            &params(&[
                ("searchTerm", " rahim "),
                ("page", "3"),
                ("limit", "500"),
                ("sortBy", "appointmentFee"),
                ("sortOrder", "ASC"),
                ("gender", "MALE"),
                ("experience", "5"),
                ("unknown", "ignored"),
            ]),
        )
        .unwrap();
        assert_eq!(q.search_term.as_deref(), Some("rahim"));
        assert_eq!((q.page, q.limit), (3, MAX_LIMIT));
        assert_eq!(q.sort_by, "appointment_fee");
        assert_eq!(q.sort_order, SortOrder::Asc);
        assert_eq!(
            q.filters,
            vec![
                ("experience".to_string(), PgBindValue::I64(5)),
                ("gender".to_string(), PgBindValue::Text("MALE".into())),
            ]
        );
    }

    #[test]
    fn non_filterable_columns_are_ignored() {
        let q = list_query_from_params(ModelName::Admin.table(), &params(&[("name", "x"), ("isDeleted", "true")])).unwrap();
        assert!(q.filters.is_empty());
    }

    #[test]
    fn bad_values_are_collected() {
        let err = list_query_from_params(
            ModelName::Doctor.table(),
            &params(&[("page", "0"), ("sortBy", "password"), ("experience", "lots")]),
        )
        .unwrap_err();
        let mut paths: Vec<_> = err.issues().iter().map(|i| i.path.clone()).collect();
        paths.sort();
        assert_eq!(paths, vec!["experience", "page", "sortBy"]);
    }

    #[test]
    fn api_names_are_camel_case() {
        assert_eq!(api_name("profile_photo"), "profilePhoto");
    }
}
