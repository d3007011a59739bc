//! Row decoding and parameter binding shared by the services.

use crate::config::{ColumnDef, ColumnKind};
use crate::error::AppError;
use crate::sql::PgBindValue;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};

/// Decode a registry row into a JSON object keyed by column name.
pub fn row_to_json(row: &PgRow, columns: &[ColumnDef]) -> Result<Value, AppError> {
    let mut map = Map::with_capacity(columns.len());
    for c in columns {
        let v = match c.kind {
            ColumnKind::Uuid => row
                .try_get::<Option<uuid::Uuid>, _>(c.name)?
                .map(|u| Value::String(u.to_string())),
            ColumnKind::Text => row.try_get::<Option<String>, _>(c.name)?.map(Value::String),
            ColumnKind::Integer => row.try_get::<Option<i32>, _>(c.name)?.map(Value::from),
            ColumnKind::Boolean => row.try_get::<Option<bool>, _>(c.name)?.map(Value::Bool),
            ColumnKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(c.name)?
                .map(|t| Value::String(t.to_rfc3339())),
        };
        map.insert(c.name.to_string(), v.unwrap_or(Value::Null));
    }
    Ok(Value::Object(map))
}

pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[PgBindValue],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = query.bind(p.clone());
    }
    query
}
